//! The recurring update cycle.
//!
//! One [`UpdateScheduler`] is built at startup and owns every piece of mutable
//! update state: the cycle state, the restart cooldown and the collaborators.
//! Cycles take `&mut self`, so two cycles can never overlap and the manifest
//! and bundle paths are only ever touched by one cycle at a time.
//!
//! A cycle walks `Idle → CheckingManifest → Downloading → Installing →
//! Committing → Idle`:
//!
//! 1. Load the local manifest; any read or parse failure means "never updated".
//! 2. Download the remote manifest through the tiered mirrors.
//! 3. Equal hashes: nothing to do. A bundle staged by an earlier cycle still
//!    triggers the restart prompt.
//! 4. Different hashes: download the bundle from the manifest's own URL list.
//! 5. Decompress it into the staged bundle path and verify it.
//! 6. Commit the remote manifest and prompt for a restart.
//!
//! Errors never escape a cycle. Each one is logged and turned into a
//! [`CycleReport`] whose `next_delay` is the short failure backoff; every
//! success path reschedules after the long interval.

mod builder;

pub use builder::SchedulerBuilder;

use crate::config::UpdatePaths;
use crate::constants::BUNDLE_ARCHIVE_FILE;
use crate::core::{Result, UpdateError};
use crate::download::RetryingDownloader;
use crate::install::{BundleInstaller, Verification};
use crate::manifest::{Manifest, ManifestStore};
use crate::mirror::{ManifestMirrors, MirrorResolver};
use crate::restart::{PromptOutcome, RestartNegotiator};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Where a cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    /// Between cycles
    #[default]
    Idle,
    /// Fetching and comparing the remote manifest
    CheckingManifest,
    /// Fetching the bundle archive
    Downloading,
    /// Decompressing and verifying the bundle
    Installing,
    /// Swapping the manifest
    Committing,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::CheckingManifest => "checking manifest",
            Self::Downloading => "downloading",
            Self::Installing => "installing",
            Self::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Remote hash equals local hash.
    UpToDate {
        /// A staged bundle from an earlier cycle is awaiting restart
        staged_pending: bool,
    },
    /// A new bundle was staged and its manifest committed.
    Updated {
        /// Hash of the committed release
        hash: String,
    },
    /// The cycle aborted.
    Failed {
        /// State in which the failure happened
        stage: CycleState,
        /// [`UpdateError::kind`] of the failure
        kind: &'static str,
        /// Rendered error
        message: String,
    },
}

impl CycleOutcome {
    /// Whether the cycle took a success path.
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    const fn wants_restart_prompt(&self) -> bool {
        matches!(
            self,
            Self::Updated { .. }
                | Self::UpToDate {
                    staged_pending: true
                }
        )
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate {
                staged_pending: false,
            } => write!(f, "up to date"),
            Self::UpToDate {
                staged_pending: true,
            } => write!(f, "up to date, staged bundle awaiting restart"),
            Self::Updated {
                hash,
            } => write!(f, "updated to {hash}"),
            Self::Failed {
                stage,
                message,
                ..
            } => write!(f, "failed while {stage}: {message}"),
        }
    }
}

/// Everything a caller may want to know about one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// How the cycle ended
    pub outcome: CycleOutcome,
    /// Delay before the next cycle should start
    pub next_delay: Duration,
    /// The remote manifest was downloaded
    pub manifest_fetched: bool,
    /// A bundle archive was downloaded
    pub bundle_downloaded: bool,
    /// Result of the restart prompt, if one was requested
    pub prompted: Option<PromptOutcome>,
}

#[derive(Debug, Default)]
struct CycleProgress {
    manifest_fetched: bool,
    bundle_downloaded: bool,
}

/// Long-lived owner of the update cycle.
pub struct UpdateScheduler {
    paths: UpdatePaths,
    store: ManifestStore,
    resolver: MirrorResolver,
    downloader: RetryingDownloader,
    installer: BundleInstaller,
    negotiator: RestartNegotiator,
    success_interval: Duration,
    failure_backoff: Duration,
    initial_delay: Duration,
    state: CycleState,
}

impl UpdateScheduler {
    /// Start building a scheduler over `paths`.
    pub fn builder(paths: UpdatePaths) -> SchedulerBuilder {
        SchedulerBuilder::new(paths)
    }

    /// Current cycle state; [`CycleState::Idle`] between cycles.
    pub const fn state(&self) -> CycleState {
        self.state
    }

    /// The file layout this scheduler works on.
    pub fn paths(&self) -> &UpdatePaths {
        &self.paths
    }

    /// Manifest store over [`UpdatePaths::local_manifest`].
    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Run one complete cycle and report how it went.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut progress = CycleProgress::default();

        let outcome = match self.try_cycle(&mut progress).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let stage = self.state;
                match &e {
                    UpdateError::ExhaustedMirrors { .. }
                    | UpdateError::Transfer { .. } => warn!(%stage, error = %e, "Update cycle failed"),
                    _ => error!(%stage, error = %e, "Update cycle failed"),
                }
                CycleOutcome::Failed {
                    stage,
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };
        self.state = CycleState::Idle;

        let prompted = if outcome.wants_restart_prompt() {
            Some(self.negotiator.prompt_restart().await)
        } else {
            None
        };

        let next_delay = if outcome.is_success() {
            self.success_interval
        } else {
            self.failure_backoff
        };
        debug!(%outcome, next_delay_secs = next_delay.as_secs(), "Cycle finished");

        CycleReport {
            outcome,
            next_delay,
            manifest_fetched: progress.manifest_fetched,
            bundle_downloaded: progress.bundle_downloaded,
            prompted,
        }
    }

    async fn try_cycle(&mut self, progress: &mut CycleProgress) -> Result<CycleOutcome> {
        self.state = CycleState::CheckingManifest;
        let local = self.store.load_local().await;

        self.downloader
            .download(self.paths.manifest_file(), self.store.remote_path(), &self.resolver)
            .await?;
        progress.manifest_fetched = true;

        let remote = self.store.read_remote().await?;

        if !Manifest::requires_update(local.as_ref(), &remote) {
            if let Err(e) = self.store.discard_remote().await {
                debug!(error = %e, "Could not remove unchanged remote manifest");
            }
            let staged_pending =
                tokio::fs::try_exists(self.paths.staged_bundle()).await.unwrap_or(false);
            info!(hash = remote.hash(), staged_pending, "Already up to date");
            return Ok(CycleOutcome::UpToDate {
                staged_pending,
            });
        }

        info!(
            current = local.as_ref().map_or("none", Manifest::hash),
            available = remote.hash(),
            "New release available"
        );

        self.state = CycleState::Downloading;
        let archive = self.paths.bundle_archive();
        let mirrors = ManifestMirrors::new(remote.bundle_urls().to_vec());
        self.downloader.download(BUNDLE_ARCHIVE_FILE, &archive, &mirrors).await?;
        progress.bundle_downloaded = true;

        self.state = CycleState::Installing;
        let staged = self.paths.staged_bundle();
        let report = self.installer.install(&archive, &staged, remote.hash()).await?;
        if let Verification::Mismatched { .. } = report.verification {
            warn!("Committing release despite checksum mismatch");
        }

        self.state = CycleState::Committing;
        self.store.commit_remote().await?;

        info!(hash = remote.hash(), "Update staged");
        Ok(CycleOutcome::Updated {
            hash: remote.hash().to_string(),
        })
    }

    /// Run cycles until `shutdown` resolves; returns the number of completed cycles.
    ///
    /// Waits the initial delay first, then sleeps each report's `next_delay`
    /// between cycles. A running cycle is never interrupted; shutdown is only
    /// observed while waiting.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(delay_ms = self.initial_delay.as_millis() as u64, "Update scheduler started");

        tokio::select! {
            biased;
            () = &mut shutdown => return 0,
            () = tokio::time::sleep(self.initial_delay) => {}
        }

        let mut cycles: u64 = 0;
        loop {
            let report = self.run_cycle().await;
            cycles += 1;

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(report.next_delay) => {}
            }
        }

        info!(cycles, "Update scheduler stopped");
        cycles
    }
}
