use super::{CycleState, UpdateScheduler};
use crate::config::{UpdatePaths, UpdaterConfig};
use crate::constants::{FAILURE_BACKOFF, INITIAL_CHECK_DELAY, RESTART_PROMPT_COOLDOWN, SUCCESS_INTERVAL};
use crate::core::Result;
use crate::download::{HttpTransport, RetryingDownloader, Transport};
use crate::install::{BundleInstaller, IntegrityPolicy};
use crate::manifest::ManifestStore;
use crate::mirror::{MirrorResolver, MirrorTable, ReleaseSource};
use crate::restart::{
    Clock, ConfirmDialog, DesktopNotifier, Notifier, ProcessRelauncher, PromptMode, Relauncher,
    RestartNegotiator, SystemClock,
};
use crate::utils::{NoProgress, ProgressReporter};
use std::sync::Arc;
use std::time::Duration;

/// Assembles an [`UpdateScheduler`] from its collaborators.
///
/// Every collaborator has a production default; tests swap in fakes.
pub struct SchedulerBuilder {
    paths: UpdatePaths,
    resolver: MirrorResolver,
    transport: Option<Arc<dyn Transport>>,
    progress: Arc<dyn ProgressReporter>,
    attempt_timeout: Option<Duration>,
    integrity: IntegrityPolicy,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    dialog: Arc<dyn ConfirmDialog>,
    relauncher: Arc<dyn Relauncher>,
    cooldown: Duration,
    success_interval: Duration,
    failure_backoff: Duration,
    initial_delay: Duration,
}

impl SchedulerBuilder {
    /// Builder with the standard mirrors, HTTP transport and desktop prompt.
    pub fn new(paths: UpdatePaths) -> Self {
        Self {
            paths,
            resolver: MirrorResolver::new(MirrorTable::standard(), ReleaseSource::default()),
            transport: None,
            progress: Arc::new(NoProgress),
            attempt_timeout: None,
            integrity: IntegrityPolicy::default(),
            clock: Arc::new(SystemClock),
            notifier: Arc::new(DesktopNotifier),
            dialog: PromptMode::default().dialog(),
            relauncher: Arc::new(ProcessRelauncher),
            cooldown: RESTART_PROMPT_COOLDOWN,
            success_interval: SUCCESS_INTERVAL,
            failure_backoff: FAILURE_BACKOFF,
            initial_delay: INITIAL_CHECK_DELAY,
        }
    }

    /// Builder configured from an [`UpdaterConfig`].
    pub fn from_config(config: &UpdaterConfig) -> anyhow::Result<Self> {
        let paths = config.paths()?;
        let resolver = MirrorResolver::new(config.mirror_table()?, config.release.clone());

        Ok(Self::new(paths)
            .resolver(resolver)
            .attempt_timeout(config.attempt_timeout())
            .integrity(config.integrity)
            .dialog(config.prompt.dialog())
            .cooldown(config.restart_cooldown())
            .intervals(config.success_interval(), config.failure_backoff())
            .initial_delay(config.initial_delay()))
    }

    /// Mirror policy for the manifest download.
    pub fn resolver(mut self, resolver: MirrorResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Transport for every download.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Progress display for downloads.
    pub fn progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Upper bound for a single download attempt.
    pub fn attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Bundle verification policy.
    pub fn integrity(mut self, policy: IntegrityPolicy) -> Self {
        self.integrity = policy;
        self
    }

    /// Time source for the restart cooldown.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Desktop notification sink.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Restart confirmation.
    pub fn dialog(mut self, dialog: Arc<dyn ConfirmDialog>) -> Self {
        self.dialog = dialog;
        self
    }

    /// Process relaunch.
    pub fn relauncher(mut self, relauncher: Arc<dyn Relauncher>) -> Self {
        self.relauncher = relauncher;
        self
    }

    /// Minimum time between restart prompts.
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Delays after successful and failed cycles.
    pub fn intervals(mut self, success: Duration, failure: Duration) -> Self {
        self.success_interval = success;
        self.failure_backoff = failure;
        self
    }

    /// Delay before the first cycle of [`UpdateScheduler::run_until`].
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Build the scheduler, creating the HTTP transport if none was given.
    pub fn build(self) -> Result<UpdateScheduler> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        let downloader = RetryingDownloader::new(transport)
            .with_progress(self.progress)
            .with_attempt_timeout(self.attempt_timeout);

        let negotiator = RestartNegotiator::new(
            self.clock,
            self.notifier,
            self.dialog,
            self.relauncher,
            self.cooldown,
        );

        Ok(UpdateScheduler {
            store: ManifestStore::new(self.paths.local_manifest()),
            paths: self.paths,
            resolver: self.resolver,
            downloader,
            installer: BundleInstaller::new(self.integrity),
            negotiator,
            success_interval: self.success_interval,
            failure_backoff: self.failure_backoff,
            initial_delay: self.initial_delay,
            state: CycleState::Idle,
        })
    }
}
