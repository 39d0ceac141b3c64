//! Concurrent report runs.
//!
//! Each configured report is fetched on its own task. A failure is logged
//! and counted for that report only; sibling fetches keep going. The run
//! finishes when every task has finished or hit its deadline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use axiom::ReportSource;

use crate::config::{Format, ReportSpec};
use crate::flatten;

/// Outcome of one run over all configured reports.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Paths written, one per successful report.
    pub saved: Vec<PathBuf>,
    /// Report name and error message, one per failed report.
    pub failed: Vec<(String, String)>,
    /// Whether any fetch was rejected because the session expired.
    pub auth_expired: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct ReportRunner<S: ReportSource + 'static> {
    source: Arc<S>,
    reports: Vec<ReportSpec>,
    reports_path: PathBuf,
    deadline: Duration,
}

impl<S: ReportSource + 'static> ReportRunner<S> {
    pub fn new(source: Arc<S>, reports: Vec<ReportSpec>, reports_path: PathBuf, deadline: Duration) -> Self {
        Self {
            source,
            reports,
            reports_path,
            deadline,
        }
    }

    /// Fetch and save every report once.
    ///
    /// If any fetch found the session expired, a new session is negotiated
    /// after all tasks have finished so the next run starts authenticated.
    pub async fn run_once(&self) -> RunSummary {
        let mut tasks = JoinSet::new();

        for report in self.reports.iter().cloned() {
            let source = self.source.clone();
            let dir = self.reports_path.clone();
            let deadline = self.deadline;

            tasks.spawn(async move {
                let result = match tokio::time::timeout(deadline, save_report(source.as_ref(), &report, &dir)).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("timed out after {:?}", deadline)),
                };
                (report.name, result)
            });
        }

        let mut summary = RunSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(path))) => {
                    info!(report = %name, path = %path.display(), "Saved report");
                    summary.saved.push(path);
                }
                Ok((name, Err(err))) => {
                    if is_auth_expired(&err) {
                        summary.auth_expired = true;
                    }
                    error!(report = %name, error = %format!("{err:#}"), "Report failed");
                    summary.failed.push((name, format!("{err:#}")));
                }
                Err(join_err) => {
                    error!(error = %join_err, "Report task panicked");
                    summary
                        .failed
                        .push(("<unknown>".to_string(), join_err.to_string()));
                }
            }
        }

        if summary.auth_expired {
            warn!("Session expired during run, logging in again");
            if let Err(err) = self.source.renegotiate().await {
                error!(error = %err, "Re-login failed; next run will use the expired session");
            }
        }

        summary
    }

    /// Run on a fixed schedule until the future is dropped.
    ///
    /// The first run starts immediately. A run that overruns the interval
    /// delays the next one rather than stacking runs.
    pub async fn run_forever(&self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let summary = self.run_once().await;
            info!(
                saved = summary.saved.len(),
                failed = summary.failed.len(),
                "Run finished"
            );
            info!("Sleeping for {:?}", every);
        }
    }
}

/// Fetch one report and write it to `dir` in its configured format.
async fn save_report<S: ReportSource + ?Sized>(source: &S, report: &ReportSpec, dir: &Path) -> Result<PathBuf> {
    let body = source.fetch_report(report.id).await?;
    let path = dir.join(report.file_name());

    let contents = match report.format {
        Format::Json => body,
        Format::Csv => {
            let records = flatten::parse_records(&body)?;
            let mut out = Vec::new();
            flatten::write_csv(&mut out, &records, &report.keys, report.print_header)?;
            out
        }
    };

    info!(report = %report.name, path = %path.display(), "Saving report");
    tokio::fs::write(&path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(path)
}

fn is_auth_expired(err: &anyhow::Error) -> bool {
    err.downcast_ref::<axiom::Error>()
        .is_some_and(axiom::Error::is_auth_expired)
}
