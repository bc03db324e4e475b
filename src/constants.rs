//! Global constants used throughout the updater.
//!
//! Scheduling intervals, prompt throttling, retry parameters and the default
//! on-disk names of the update artifacts. Configurable values here are only
//! the defaults; [`crate::config::UpdaterConfig`] can override them.

use std::time::Duration;

/// Delay before the next cycle after a cycle that completed without error.
pub const SUCCESS_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Delay before the next cycle after any failed stage.
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(2 * 60);

/// Delay between process start and the first update cycle.
pub const INITIAL_CHECK_DELAY: Duration = Duration::from_secs(1);

/// Minimum time between two restart prompts.
pub const RESTART_PROMPT_COOLDOWN: Duration = Duration::from_secs(10 * 60);

/// Upper bound on a single download attempt against one mirror.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Connect timeout for the HTTP client.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// First delay between two download attempts in milliseconds.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Cap on the delay between two download attempts in milliseconds.
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Marker argument appended when the process relaunches itself into a new bundle.
pub const RELAUNCH_FLAG: &str = "--relaunch";

/// Exit code used when the process terminates after an unexpected panic.
pub const FATAL_EXIT_CODE: i32 = -2;

/// Default file name of the release manifest on the release host and on disk.
pub const DEFAULT_MANIFEST_FILE: &str = "abyui-release.json";

/// Suffix appended to the local manifest path for the freshly downloaded copy.
pub const REMOTE_MANIFEST_SUFFIX: &str = "remote";

/// Suffix appended to a download target while the transfer is in flight.
pub const PARTIAL_DOWNLOAD_SUFFIX: &str = "part";

/// File name under which the bundle archive is requested and stored.
pub const BUNDLE_ARCHIVE_FILE: &str = "app.asar.gz";

/// File name of the decompressed bundle that waits for a restart.
pub const STAGED_BUNDLE_FILE: &str = "app-updated.asar";

/// Directory next to the executable holding the manifest and config.
pub const DATA_DIR_NAME: &str = "data";

/// Directory next to the executable holding application bundles.
pub const RESOURCES_DIR_NAME: &str = "resources";

/// Default config file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "updater.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV_VAR: &str = "BUNDLE_UPDATER_CONFIG";

/// Environment variable disabling progress bars.
pub const NO_PROGRESS_ENV_VAR: &str = "BUNDLE_UPDATER_NO_PROGRESS";
