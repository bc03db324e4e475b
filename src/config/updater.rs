//! Updater configuration file.
//!
//! The updater reads an optional TOML file. Every key has a default, so a
//! missing file, an empty file and a partial file are all valid:
//!
//! ```toml
//! check_interval_secs = 300
//! retry_backoff_secs = 120
//! attempt_timeout_secs = 120
//! integrity = "warn"
//! prompt = "dialog"
//! manifest_file = "abyui-release.json"
//!
//! [release]
//! user = "aby-ui"
//! repo = "repo-release"
//! reference = "master"
//!
//! [[mirrors]]
//! max_retry = 2
//! backend = "gitlab"
//!
//! [[mirrors]]
//! max_retry = 5
//! backend = "github"
//!
//! [paths]
//! data_dir = "/opt/app/data"
//! ```
//!
//! # Location
//!
//! 1. `--config <PATH>` on the command line
//! 2. `BUNDLE_UPDATER_CONFIG` environment variable
//! 3. `<directory of the executable>/data/updater.toml`

use crate::config::UpdatePaths;
use crate::constants::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DATA_DIR_NAME, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MANIFEST_FILE,
    FAILURE_BACKOFF,
    INITIAL_CHECK_DELAY, RESOURCES_DIR_NAME, RESTART_PROMPT_COOLDOWN, SUCCESS_INTERVAL,
};
use crate::install::IntegrityPolicy;
use crate::mirror::{MirrorTable, MirrorTier, ReleaseSource, standard_tiers};
use crate::restart::PromptMode;
use crate::utils::atomic_write_async;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Complete updater configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Seconds between cycles after a successful cycle
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Seconds between cycles after a failed cycle
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,

    /// Seconds between startup and the first cycle
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    /// Upper bound for one download attempt in seconds; 0 disables the bound
    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,

    /// Minimum seconds between two restart prompts
    #[serde(default = "default_restart_cooldown")]
    pub restart_cooldown_secs: u64,

    /// Verification of the decompressed bundle against the manifest hash
    #[serde(default)]
    pub integrity: IntegrityPolicy,

    /// How the restart prompt is presented
    #[serde(default)]
    pub prompt: PromptMode,

    /// Manifest file name, both in the release repository and in the data directory
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    /// Where the release manifest is published
    #[serde(default)]
    pub release: ReleaseSource,

    /// Mirror tiers for the manifest download, in priority order
    #[serde(default = "standard_tiers")]
    pub mirrors: Vec<MirrorTier>,

    /// Directory overrides
    #[serde(default, skip_serializing_if = "PathOverrides::is_empty")]
    pub paths: PathOverrides,
}

/// Optional directory overrides; unset entries derive from the executable location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathOverrides {
    /// Directory holding the manifest, config and lock files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Directory holding the bundle archive and the staged bundle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources_dir: Option<PathBuf>,
}

impl PathOverrides {
    fn is_empty(&self) -> bool {
        self.data_dir.is_none() && self.resources_dir.is_none()
    }
}

fn default_manifest_file() -> String {
    DEFAULT_MANIFEST_FILE.to_string()
}

fn default_check_interval() -> u64 {
    SUCCESS_INTERVAL.as_secs()
}

fn default_retry_backoff() -> u64 {
    FAILURE_BACKOFF.as_secs()
}

fn default_initial_delay() -> u64 {
    INITIAL_CHECK_DELAY.as_secs()
}

fn default_attempt_timeout() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT.as_secs()
}

fn default_restart_cooldown() -> u64 {
    RESTART_PROMPT_COOLDOWN.as_secs()
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            manifest_file: default_manifest_file(),
            release: ReleaseSource::default(),
            mirrors: standard_tiers(),
            check_interval_secs: default_check_interval(),
            retry_backoff_secs: default_retry_backoff(),
            initial_delay_secs: default_initial_delay(),
            attempt_timeout_secs: default_attempt_timeout(),
            restart_cooldown_secs: default_restart_cooldown(),
            integrity: IntegrityPolicy::default(),
            prompt: PromptMode::default(),
            paths: PathOverrides::default(),
        }
    }
}

impl UpdaterConfig {
    /// Load from the default location, falling back to defaults if the file is absent.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, otherwise from the default location.
    ///
    /// A missing file yields defaults; an unreadable or invalid file is an error.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load and validate a specific file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read updater config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse updater config from {}", path.display()))?;

        config.mirror_table().with_context(|| format!("Invalid mirrors in {}", path.display()))?;

        debug!(path = %path.display(), "Loaded updater config");
        Ok(config)
    }

    /// Write the config to `path` atomically.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize updater config")?;

        atomic_write_async(path, content.into_bytes())
            .await
            .with_context(|| format!("Failed to write updater config to {}", path.display()))
    }

    /// `BUNDLE_UPDATER_CONFIG`, or `updater.toml` in the data directory next to the executable.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }

        Ok(install_root()?.join(DATA_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Validated mirror policy.
    pub fn mirror_table(&self) -> crate::core::Result<MirrorTable> {
        MirrorTable::new(self.mirrors.clone())
    }

    /// Resolve the file layout, applying directory overrides.
    pub fn paths(&self) -> Result<UpdatePaths> {
        let (data_dir, resources_dir) = match (&self.paths.data_dir, &self.paths.resources_dir) {
            (Some(data), Some(resources)) => (data.clone(), resources.clone()),
            (data, resources) => {
                let root = install_root()?;
                (
                    data.clone().unwrap_or_else(|| root.join(DATA_DIR_NAME)),
                    resources.clone().unwrap_or_else(|| root.join(RESOURCES_DIR_NAME)),
                )
            }
        };

        Ok(UpdatePaths::new(&data_dir, &resources_dir, &self.manifest_file))
    }

    /// Delay after a successful cycle.
    pub const fn success_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Delay after a failed cycle.
    pub const fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }

    /// Delay before the first cycle.
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    /// Per-attempt download bound, `None` when disabled.
    pub const fn attempt_timeout(&self) -> Option<Duration> {
        if self.attempt_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.attempt_timeout_secs))
        }
    }

    /// Minimum time between restart prompts.
    pub const fn restart_cooldown(&self) -> Duration {
        Duration::from_secs(self.restart_cooldown_secs)
    }
}

/// Directory containing the running executable.
///
/// Falls back to the platform data directory when the executable path is unknown.
fn install_root() -> Result<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));

    match exe_dir {
        Some(dir) => Ok(dir),
        None => dirs::data_local_dir()
            .map(|dir| dir.join("bundle-updater"))
            .context("Could not determine the executable or data directory"),
    }
}
