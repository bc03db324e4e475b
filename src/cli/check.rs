//! `check`: one immediate update cycle.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use super::CliConfig;
use super::run::LOCK_NAME;
use crate::scheduler::{CycleOutcome, CycleReport};
use crate::utils::InstanceLock;

/// Run one update cycle now and print what happened.
#[derive(Args, Debug, Default)]
pub struct CheckCommand {
    /// Print the cycle report as JSON
    #[arg(long)]
    json: bool,
}

impl CheckCommand {
    /// Execute one cycle; a failed cycle is reported as an error.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_updater_config().await?;
        let mut scheduler = cli.scheduler(&config)?;
        let _lock = InstanceLock::acquire(scheduler.paths().data_dir(), LOCK_NAME)
            .await
            .context("Another updater is already running")?;

        let report = scheduler.run_cycle().await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
        } else {
            print_report(&report);
        }

        if let CycleOutcome::Failed {
            message,
            ..
        } = report.outcome
        {
            bail!("Update check failed: {message}");
        }
        Ok(())
    }
}

fn print_report(report: &CycleReport) {
    let outcome = report.outcome.to_string();
    let outcome = match &report.outcome {
        CycleOutcome::Updated { .. } => outcome.green().bold(),
        CycleOutcome::UpToDate { .. } => outcome.green(),
        CycleOutcome::Failed { .. } => outcome.red(),
    };

    println!("{} {outcome}", "Outcome:".bold());
    println!("{} {}s", "Next check in:".bold(), report.next_delay.as_secs());
    if report.bundle_downloaded {
        println!("{} downloaded", "Bundle:".bold());
    }
}

pub(super) fn report_json(report: &CycleReport) -> serde_json::Value {
    let (status, detail) = match &report.outcome {
        CycleOutcome::UpToDate {
            staged_pending,
        } => ("up_to_date", serde_json::json!({ "staged_pending": staged_pending })),
        CycleOutcome::Updated {
            hash,
        } => ("updated", serde_json::json!({ "hash": hash })),
        CycleOutcome::Failed {
            stage,
            kind,
            message,
        } => (
            "failed",
            serde_json::json!({ "stage": stage.to_string(), "kind": kind, "message": message }),
        ),
    };

    serde_json::json!({
        "status": status,
        "detail": detail,
        "next_delay_secs": report.next_delay.as_secs(),
        "manifest_fetched": report.manifest_fetched,
        "bundle_downloaded": report.bundle_downloaded,
        "prompted": report.prompted.map(|p| format!("{p:?}").to_lowercase()),
    })
}
