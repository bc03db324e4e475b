//! `run`: the long-lived background update loop.

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use super::CliConfig;
use crate::restart::PromptMode;
use crate::shell::install_fatal_handler;
use crate::utils::InstanceLock;

/// Lock name under `<data_dir>/.locks`.
pub(super) const LOCK_NAME: &str = "updater";

/// Run update cycles until interrupted with Ctrl-C.
#[derive(Args, Debug, Default)]
pub struct RunCommand {
    /// Run exactly one cycle after the initial delay, then exit
    #[arg(long)]
    once: bool,
}

impl RunCommand {
    /// Execute the loop.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = cli.load_updater_config().await?;
        install_fatal_handler(config.prompt == PromptMode::Dialog);

        let mut scheduler = cli.scheduler(&config)?;
        let _lock = InstanceLock::acquire(scheduler.paths().data_dir(), LOCK_NAME)
            .await
            .context("Another updater is already running")?;

        info!(
            manifest = %scheduler.paths().local_manifest().display(),
            interval_secs = config.check_interval_secs,
            "Starting update loop"
        );

        if self.once {
            tokio::time::sleep(config.initial_delay()).await;
            let report = scheduler.run_cycle().await;
            info!(outcome = %report.outcome, "Cycle complete");
            return Ok(());
        }

        let cycles = scheduler
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Cannot listen for Ctrl-C; running until killed");
                    std::future::pending::<()>().await;
                }
            })
            .await;

        info!(cycles, "Update loop stopped");
        Ok(())
    }
}
