//! `status`: what is installed and what is waiting for a restart.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::CliConfig;
use crate::manifest::ManifestStore;

/// Show the installed release, the staged bundle and the file layout.
#[derive(Args, Debug, Default)]
pub struct StatusCommand {
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct Status {
    pub config_path: PathBuf,
    pub config_present: bool,
    pub local_manifest: PathBuf,
    pub installed_hash: Option<String>,
    pub staged_bundle: PathBuf,
    pub staged_bytes: Option<u64>,
    pub remote_leftover: bool,
}

impl StatusCommand {
    /// Print the status.
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let status = collect(cli).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        println!("{}", "Updater status".bold());
        let config_note = if status.config_present { "" } else { " (not found, using defaults)" };
        println!("  Config:          {}{config_note}", status.config_path.display());
        println!("  Manifest:        {}", status.local_manifest.display());
        match &status.installed_hash {
            Some(hash) => println!("  Installed:       {}", hash.green()),
            None => println!("  Installed:       {}", "none".yellow()),
        }
        match status.staged_bytes {
            Some(bytes) => println!(
                "  Staged bundle:   {} ({bytes} bytes, {})",
                status.staged_bundle.display(),
                "restart to apply".cyan()
            ),
            None => println!("  Staged bundle:   none"),
        }
        if status.remote_leftover {
            println!("  {}", "An interrupted cycle left a downloaded manifest behind".yellow());
        }

        Ok(())
    }
}

pub(super) async fn collect(cli: &CliConfig) -> Result<Status> {
    let config_path = cli.effective_config_path()?;
    let config_present = tokio::fs::try_exists(&config_path).await.unwrap_or(false);
    let config = cli.load_updater_config().await?;
    let paths = config.paths()?;

    let store = ManifestStore::new(paths.local_manifest());
    let installed_hash = store.load_local().await.map(|m| m.hash().to_string());
    let remote_leftover = tokio::fs::try_exists(store.remote_path()).await.unwrap_or(false);

    let staged_bundle = paths.staged_bundle();
    let staged_bytes = tokio::fs::metadata(&staged_bundle).await.ok().map(|m| m.len());

    Ok(Status {
        config_path,
        config_present,
        local_manifest: paths.local_manifest(),
        installed_hash,
        staged_bundle,
        staged_bytes,
        remote_leftover,
    })
}
