//! Test utilities for the updater
//!
//! Fakes for every collaborator the scheduler talks to, plus fixtures that lay
//! out a complete installation inside a temporary directory:
//!
//! - [`FakeTransport`]: serves canned bodies or failures per URL and records requests
//! - [`FakeClock`]: manually advanced time for the restart cooldown
//! - [`RecordingNotifier`], [`ScriptedDialog`], [`RecordingRelauncher`]: restart prompt seams
//! - [`SchedulerFixture`]: temp install tree wired to all of the above
//!
//! # Example
//!
//! ```rust,no_run
//! use bundle_updater::test_utils::SchedulerFixture;
//!
//! # async fn example() {
//! let fixture = SchedulerFixture::new();
//! fixture.seed_local("abc", &["https://cdn.example/app.asar.gz"]);
//! fixture.serve_manifest("abc", &["https://cdn.example/app.asar.gz"]);
//!
//! let report = fixture.scheduler().run_cycle().await;
//! assert!(report.outcome.is_success());
//! # }
//! ```

mod fakes;
mod fixture;

pub use fakes::{FakeClock, FakeTransport, RecordingNotifier, RecordingRelauncher, ScriptedDialog};
pub use fixture::SchedulerFixture;

use crate::manifest::Manifest;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, otherwise
/// `RUST_LOG`; with neither, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=bundle_updater=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Gzip-compress `data` the way bundle archives are published.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap_or_else(|e| panic!("gzip write failed: {e}"));
    encoder.finish().unwrap_or_else(|e| panic!("gzip finish failed: {e}"))
}

/// Pretty JSON of a manifest with `hash` and bundle `urls`.
pub fn manifest_json(hash: &str, urls: &[&str]) -> String {
    let manifest = Manifest::new(hash, urls.iter().map(|url| (*url).to_string()).collect());
    manifest.to_json_pretty().unwrap_or_else(|e| panic!("manifest serialization failed: {e}"))
}
