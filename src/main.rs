//! Bundle updater entry point
//!
//! Parses the command line, runs the selected command and renders any error
//! with context and suggestions:
//! - `run` - Background update loop (default)
//! - `check` - One update cycle now
//! - `status` - Installed release and staged bundle
//! - `config` - Show or initialize the config file

use anyhow::Result;
use bundle_updater::cli;
use bundle_updater::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
