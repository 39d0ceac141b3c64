//! Login command implementation.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::Config;
use crate::output;

#[derive(Args, Debug)]
pub struct LoginArgs {}

pub async fn run(_args: LoginArgs, config: Config) -> Result<()> {
    eprintln!("{}", "Logging in...".dimmed());

    let client = super::connect(&config).await?;
    let session = client.session().await;

    output::success("Logged in successfully");
    println!();
    output::field("Tenant", session.tenant());
    output::field("Portal", session.portal().base().as_str());
    output::field("Since", &session.established_at().to_rfc3339());

    Ok(())
}
