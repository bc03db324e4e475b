//! `config`: inspect or create the updater configuration file.
//!
//! ```bash
//! bundle-updater config            # same as `config show`
//! bundle-updater config show
//! bundle-updater config init [--force]
//! bundle-updater config path
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::CliConfig;
use crate::config::UpdaterConfig;

/// Manage the updater configuration.
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Print the effective configuration
    Show,

    /// Write a config file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location
    Path,
}

impl ConfigCommand {
    /// Run the subcommand.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(cli).await,
            Some(ConfigSubcommands::Init {
                force,
            }) => Self::init(cli, force).await,
            Some(ConfigSubcommands::Path) => {
                println!("{}", cli.effective_config_path()?.display());
                Ok(())
            }
        }
    }

    async fn show(cli: &CliConfig) -> Result<()> {
        let path = cli.effective_config_path()?;
        let config = cli.load_updater_config().await?;

        println!("{}", "Updater Configuration".bold());
        println!("Location: {}\n", path.display());
        println!("{}", toml::to_string_pretty(&config)?);
        Ok(())
    }

    async fn init(cli: &CliConfig, force: bool) -> Result<()> {
        let path = cli.effective_config_path()?;

        if path.exists() && !force {
            println!("❌ Config already exists at: {}", path.display());
            println!("   Use --force to overwrite");
            return Ok(());
        }

        let config = UpdaterConfig::default();
        config.save_to(&path).await?;

        println!("✅ Created updater config at: {}", path.display());
        Ok(())
    }
}
