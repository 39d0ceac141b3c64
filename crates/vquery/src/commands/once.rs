//! Single-run command implementation.

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::Args;

use crate::config::Config;
use crate::output;
use crate::runner::ReportRunner;

#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Only run the named reports (repeatable, or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

pub async fn run(args: OnceArgs, config: Config) -> Result<()> {
    let reports: Vec<_> = if args.only.is_empty() {
        config.reports.clone()
    } else {
        for name in &args.only {
            if !config.reports.iter().any(|r| &r.name == name) {
                bail!("No report named '{name}' in config");
            }
        }
        config
            .reports
            .iter()
            .filter(|r| args.only.contains(&r.name))
            .cloned()
            .collect()
    };
    if reports.is_empty() {
        bail!("No reports configured");
    }

    let client = Arc::new(super::connect(&config).await?);
    let runner = ReportRunner::new(
        client,
        reports,
        config.reports_path,
        config.timeout,
    );

    let summary = runner.run_once().await;

    for path in &summary.saved {
        output::success(&format!("Saved {}", path.display()));
    }
    for (name, message) in &summary.failed {
        output::error(&format!("{name}: {message}"));
    }

    if !summary.is_success() {
        let total = summary.failed.len() + summary.saved.len();
        bail!("{} of {} reports failed", summary.failed.len(), total);
    }
    Ok(())
}
