//! Subcommand implementations.

mod login;
mod once;
mod report;
mod run;
mod serve;

use anyhow::{Context, Result};
use clap::Subcommand;

use axiom::{AuthenticatedClient, Negotiator};

use crate::config::Config;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Save the configured reports on a schedule until interrupted
    Run(run::RunArgs),

    /// Save the configured reports once and exit
    Once(once::OnceArgs),

    /// Print a single report to stdout
    Report(report::ReportArgs),

    /// Log in and show the negotiated session
    Login(login::LoginArgs),

    /// Serve reports over HTTP
    Serve(serve::ServeArgs),
}

pub async fn handle(cmd: Command, config: Config) -> Result<()> {
    match cmd {
        Command::Run(args) => run::run(args, config).await,
        Command::Once(args) => once::run(args, config).await,
        Command::Report(args) => report::run(args, config).await,
        Command::Login(args) => login::run(args, config).await,
        Command::Serve(args) => serve::run(args, config).await,
    }
}

/// Negotiate a session for the configured tenant.
async fn connect(config: &Config) -> Result<AuthenticatedClient> {
    let negotiator = Negotiator::new(config.portal()?).with_timeout(config.timeout);
    AuthenticatedClient::connect_with(negotiator, config.credentials())
        .await
        .context("Failed to log in")
}
