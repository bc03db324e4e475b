//! Configuration and file layout.
//!
//! - [`UpdaterConfig`]: the optional TOML config file with scheduling,
//!   mirror and prompt settings
//! - [`UpdatePaths`]: where manifests and bundles live on disk

mod paths;
mod updater;

pub use paths::UpdatePaths;
pub use updater::{PathOverrides, UpdaterConfig};
