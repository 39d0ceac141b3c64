//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Command;

/// Fetch Veracross Axiom reports and save them as JSON or CSV.
#[derive(Parser, Debug)]
#[command(name = "vquery")]
#[command(author, version = env!("VQUERY_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file to load
    #[arg(short, long, env = "VQUERY_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}
