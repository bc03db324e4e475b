use super::{
    FakeClock, FakeTransport, RecordingNotifier, RecordingRelauncher, ScriptedDialog, gzip,
    manifest_json,
};
use crate::config::UpdatePaths;
use crate::mirror::{MirrorBackend, MirrorTable, ReleaseSource};
use crate::restart::RestartChoice;
use crate::scheduler::{SchedulerBuilder, UpdateScheduler};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A throwaway installation with every scheduler collaborator faked.
///
/// The tree lives under a [`TempDir`] (`data/` and `resources/`) and is
/// removed when the fixture is dropped.
pub struct SchedulerFixture {
    /// Root of the fake installation
    pub temp: TempDir,
    /// Layout under [`temp`](Self::temp)
    pub paths: UpdatePaths,
    /// Network
    pub transport: Arc<FakeTransport>,
    /// Cooldown time
    pub clock: Arc<FakeClock>,
    /// Notifications
    pub notifier: Arc<RecordingNotifier>,
    /// Restart question
    pub dialog: Arc<ScriptedDialog>,
    /// Relaunch
    pub relauncher: Arc<RecordingRelauncher>,
}

impl SchedulerFixture {
    /// Fixture whose dialog always answers "Later".
    pub fn new() -> Self {
        Self::with_choice(RestartChoice::Later)
    }

    /// Fixture whose dialog always answers `choice`.
    pub fn with_choice(choice: RestartChoice) -> Self {
        let temp = TempDir::new().unwrap_or_else(|e| panic!("failed to create temp dir: {e}"));
        let paths = UpdatePaths::under(temp.path());
        std::fs::create_dir_all(paths.data_dir()).unwrap();
        std::fs::create_dir_all(paths.resources_dir()).unwrap();

        Self {
            temp,
            paths,
            transport: Arc::new(FakeTransport::new()),
            clock: Arc::new(FakeClock::new()),
            notifier: Arc::new(RecordingNotifier::default()),
            dialog: Arc::new(ScriptedDialog::always(choice)),
            relauncher: Arc::new(RecordingRelauncher::default()),
        }
    }

    /// Builder wired to the fakes, with the standard intervals and cooldown.
    pub fn builder(&self) -> SchedulerBuilder {
        UpdateScheduler::builder(self.paths.clone())
            .transport(self.transport.clone())
            .clock(self.clock.clone())
            .notifier(self.notifier.clone())
            .dialog(self.dialog.clone())
            .relauncher(self.relauncher.clone())
            .attempt_timeout(Some(Duration::from_secs(5)))
    }

    /// Scheduler from [`builder`](Self::builder).
    pub fn scheduler(&self) -> UpdateScheduler {
        self.builder().build().unwrap_or_else(|e| panic!("failed to build scheduler: {e}"))
    }

    /// URL the standard mirror table uses for the manifest on `retry`.
    pub fn manifest_url(&self, retry: u32) -> String {
        let backend = MirrorTable::standard().backend_for(retry).unwrap_or(MirrorBackend::Github);
        backend.raw_url(&ReleaseSource::default(), self.paths.manifest_file())
    }

    /// Publish a remote manifest on the first mirror; returns the served JSON.
    pub fn serve_manifest(&self, hash: &str, urls: &[&str]) -> String {
        let json = manifest_json(hash, urls);
        self.transport.serve(&self.manifest_url(0), json.clone().into_bytes());
        json
    }

    /// Publish `contents`, gzip-compressed, at `url`.
    pub fn serve_bundle(&self, url: &str, contents: &[u8]) {
        self.transport.serve(url, gzip(contents));
    }

    /// Write a local manifest as if an earlier update had been committed.
    pub fn seed_local(&self, hash: &str, urls: &[&str]) {
        std::fs::write(self.paths.local_manifest(), manifest_json(hash, urls)).unwrap();
    }

    /// Leave a staged bundle behind as if an earlier cycle installed it.
    pub fn stage_bundle(&self, contents: &[u8]) {
        std::fs::write(self.paths.staged_bundle(), contents).unwrap();
    }

    /// Current local manifest text, if any.
    pub fn local_manifest_text(&self) -> Option<String> {
        std::fs::read_to_string(self.paths.local_manifest()).ok()
    }
}

impl Default for SchedulerFixture {
    fn default() -> Self {
        Self::new()
    }
}
