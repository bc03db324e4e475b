//! Command-line interface for the updater.
//!
//! ```text
//! bundle-updater [-v|-q] [--config PATH] [--no-progress] [COMMAND]
//!
//! Commands:
//!   run     Run the background update loop until interrupted (default)
//!   check   Run one update cycle now and report the outcome
//!   status  Show the installed release and any staged bundle
//!   config  Show or initialize the updater configuration
//! ```
//!
//! Global flags apply to every command. `--relaunch` is passed by the updater
//! itself when it restarts into a new bundle; it is accepted and logged.
//!
//! Logging goes to stderr through `tracing-subscriber`. `RUST_LOG` takes
//! precedence; otherwise `--verbose` selects `debug`, `--quiet` selects `warn`,
//! and the default is `info`.

mod check;
mod config;
mod run;
mod status;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::UpdaterConfig;
use crate::scheduler::{SchedulerBuilder, UpdateScheduler};
use crate::utils::progress::is_progress_disabled;
use crate::utils::{NoProgress, ProgressReporter, TerminalProgress};

pub use check::CheckCommand;
pub use config::ConfigCommand;
pub use run::RunCommand;
pub use status::StatusCommand;

/// Runtime settings derived from the global flags.
///
/// Commands receive this instead of reading flags or the environment
/// themselves, so tests can drive them directly.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log level when `RUST_LOG` is unset
    pub log_level: Option<String>,

    /// Hide progress bars
    pub no_progress: bool,

    /// Explicit config file, overriding the default location
    pub config_path: Option<PathBuf>,

    /// The process was started by a restart into a new bundle
    pub relaunched: bool,
}

impl CliConfig {
    /// Settings with every flag unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the updater config honouring `--config`.
    pub async fn load_updater_config(&self) -> Result<UpdaterConfig> {
        UpdaterConfig::load_with_optional(self.config_path.clone()).await
    }

    /// Progress reporter honouring `--no-progress` and the environment.
    pub fn progress(&self) -> Arc<dyn ProgressReporter> {
        if self.no_progress || is_progress_disabled() {
            Arc::new(NoProgress)
        } else {
            Arc::new(TerminalProgress::new())
        }
    }

    /// Production scheduler for `config` with this run's progress display.
    pub fn scheduler(&self, config: &UpdaterConfig) -> Result<UpdateScheduler> {
        let scheduler = SchedulerBuilder::from_config(config)?.progress(self.progress()).build()?;
        Ok(scheduler)
    }

    /// The config file path in effect.
    pub fn effective_config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => UpdaterConfig::default_path(),
        }
    }
}

/// Background updater that stages new application bundles from mirrored release hosts.
#[derive(Parser)]
#[command(
    name = "bundle-updater",
    about = "Keep the application bundle up to date in the background",
    version,
    long_about = "Checks the release manifest on a schedule, downloads new bundles through mirrored hosts, stages them next to the running installation and offers a restart."
)]
pub struct Cli {
    /// Command to run; defaults to `run`
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the updater config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    /// Set by the updater when it restarts into a new bundle
    #[arg(long, global = true, hide = true)]
    relaunch: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the background update loop until interrupted
    Run(RunCommand),

    /// Run one update cycle now and report the outcome
    Check(CheckCommand),

    /// Show the installed release and any staged bundle
    Status(StatusCommand),

    /// Show or initialize the updater configuration
    Config(ConfigCommand),
}

impl Cli {
    /// Initialize logging and run the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(config.log_level.as_deref());
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        };

        CliConfig {
            log_level: Some(log_level.to_string()),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            relaunched: self.relaunch,
        }
    }

    /// Run the selected command with explicit settings.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        if config.relaunched {
            info!("Started after update relaunch");
        }

        match self.command {
            None => RunCommand::default().execute(&config).await,
            Some(Commands::Run(cmd)) => cmd.execute(&config).await,
            Some(Commands::Check(cmd)) => cmd.execute(&config).await,
            Some(Commands::Status(cmd)) => cmd.execute(&config).await,
            Some(Commands::Config(cmd)) => cmd.execute(&config).await,
        }
    }
}

/// Install the stderr subscriber; `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("bundle_updater={}", default_level.unwrap_or("info")))
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
