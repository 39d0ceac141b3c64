//! Scheduled run command implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use tracing::info;

use crate::config::Config;
use crate::duration;
use crate::runner::ReportRunner;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Time between runs, overriding the config (e.g. 30m, 1h)
    #[arg(long, value_parser = duration::parse)]
    pub interval: Option<Duration>,
}

pub async fn run(args: RunArgs, config: Config) -> Result<()> {
    let interval = args.interval.unwrap_or(config.interval);
    if interval.is_zero() {
        bail!("interval must be greater than zero");
    }
    if config.reports.is_empty() {
        bail!("No reports configured");
    }

    let client = Arc::new(super::connect(&config).await?);
    let runner = ReportRunner::new(
        client,
        config.reports,
        config.reports_path,
        config.timeout,
    );

    info!(every = ?interval, "Starting scheduled runs");

    tokio::select! {
        _ = runner.run_forever(interval) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
