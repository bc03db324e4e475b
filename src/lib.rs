//! Bundle Updater
//!
//! A background self-updater for desktop applications that ship their code as
//! a single packaged bundle. The updater periodically checks a release
//! manifest, downloads a newer bundle through mirrored hosts, stages it next
//! to the running installation and offers the user a restart. The running
//! installation is never modified and no step leaves partial state behind.
//!
//! # Architecture Overview
//!
//! ```text
//! load local manifest
//!   -> download remote manifest      (tiered repository mirrors)
//!   -> compare hashes                (equal: done)
//!   -> download bundle archive       (the manifest's own CDN list)
//!   -> decompress to staged bundle
//!   -> commit manifest               (remove local, rename remote)
//!   -> prompt for restart            (at most once per cooldown)
//! ```
//!
//! - [`manifest`]: release manifest model, local/remote copies and the commit swap
//! - [`mirror`]: tiered mirror policy and raw-file URL templates
//! - [`download`]: transport seam and the retrying downloader
//! - [`install`]: streaming gzip install of the staged bundle, integrity policy
//! - [`restart`]: throttled restart prompt and process relaunch
//! - [`scheduler`]: the cycle state machine and its run loop
//!
//! ## Supporting Modules
//! - [`config`]: TOML configuration and on-disk layout
//! - [`core`]: error taxonomy and user-facing error rendering
//! - [`shell`]: fatal panic handling
//! - [`utils`]: atomic writes, backoff, single-instance lock, progress
//! - [`cli`]: command-line surface
//!
//! # Example
//!
//! ```rust,no_run
//! use bundle_updater::config::UpdaterConfig;
//! use bundle_updater::scheduler::SchedulerBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::load().await?;
//! let mut scheduler = SchedulerBuilder::from_config(&config)?.build()?;
//!
//! let report = scheduler.run_cycle().await;
//! println!("{} (next check in {:?})", report.outcome, report.next_delay);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod download;
pub mod install;
pub mod manifest;
pub mod mirror;
pub mod restart;
pub mod scheduler;
pub mod shell;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
