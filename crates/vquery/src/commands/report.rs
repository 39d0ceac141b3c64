//! Single report command implementation.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;

use crate::config::{Config, Format};
use crate::flatten;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Report id, as shown in the portal's query URL
    #[arg(long)]
    pub id: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// Dotted key paths to select as CSV columns (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Print the key names as the first CSV row
    #[arg(long)]
    pub header: bool,
}

pub async fn run(args: ReportArgs, config: Config) -> Result<()> {
    let keys: Vec<String> = args
        .keys
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if args.format == Format::Csv && keys.is_empty() {
        bail!("--keys is required for csv output");
    }

    let client = super::connect(&config).await?;
    let body = client.fetch_resource(args.id).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        Format::Json => {
            out.write_all(&body)?;
            writeln!(out)?;
        }
        Format::Csv => {
            let records = flatten::parse_records(&body)?;
            flatten::write_csv(&mut out, &records, &keys, args.header)?;
        }
    }

    Ok(())
}
