//! Downloads with mirror failover.
//!
//! [`RetryingDownloader::download`] fetches one logical file into one target
//! path. Each attempt asks a [`UrlSelector`] for the URL of the current retry
//! count; when the selector has nothing left the download fails with
//! [`UpdateError::ExhaustedMirrors`]. The same downloader serves both the
//! manifest (tiered repository mirrors) and the bundle (the manifest's own CDN
//! list), only the selector differs.
//!
//! Every attempt streams into `<target>.part`. The target itself is replaced by
//! a rename only after an attempt completed, so an interrupted or failed
//! attempt never leaves a truncated target behind. Failed attempts remove
//! their part file and wait a short exponential backoff before the next one.

mod transport;

pub use transport::{HttpTransport, Transport};

use crate::constants::PARTIAL_DOWNLOAD_SUFFIX;
use crate::core::{Result, UpdateError};
use crate::mirror::UrlSelector;
use crate::utils::backoff::wait_before_attempt;
use crate::utils::{NoProgress, ProgressReporter, with_suffix};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// URL that delivered the file
    pub url: String,
    /// Bytes written to the target
    pub bytes: u64,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// State of one download: where it goes, where it streams to, which retry is next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadAttempt {
    target: PathBuf,
    temp: PathBuf,
    retry: u32,
}

impl DownloadAttempt {
    /// Fresh attempt for `target`, streaming into `<target>.part`.
    pub fn new(target: &Path) -> Self {
        Self {
            target: target.to_path_buf(),
            temp: with_suffix(target, PARTIAL_DOWNLOAD_SUFFIX),
            retry: 0,
        }
    }

    /// Final destination.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Part file the current attempt writes to.
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Number of failed attempts so far.
    pub const fn retry_count(&self) -> u32 {
        self.retry
    }

    fn advance(&mut self) {
        self.retry += 1;
    }

    async fn discard(&self) {
        let _ = tokio::fs::remove_file(&self.temp).await;
    }

    async fn finalize(&self) -> Result<()> {
        tokio::fs::rename(&self.temp, &self.target)
            .await
            .map_err(|e| UpdateError::stream("finalizing", &self.target, e))
    }
}

/// Downloader that walks a [`UrlSelector`] until one attempt succeeds.
#[derive(Clone)]
pub struct RetryingDownloader {
    transport: Arc<dyn Transport>,
    progress: Arc<dyn ProgressReporter>,
    attempt_timeout: Option<Duration>,
}

impl RetryingDownloader {
    /// Downloader over `transport` with no progress display and no attempt timeout.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            progress: Arc::new(NoProgress),
            attempt_timeout: None,
        }
    }

    /// Report byte progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Abort any single attempt that runs longer than `timeout`.
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Download `file` into `target`, trying URLs from `selector` in order.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::ExhaustedMirrors`] when the selector runs out of URLs
    /// - [`UpdateError::Stream`] when the target directory cannot be prepared or
    ///   the completed part file cannot be moved into place
    pub async fn download(
        &self,
        file: &str,
        target: &Path,
        selector: &dyn UrlSelector,
    ) -> Result<DownloadOutcome> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| UpdateError::stream("creating", parent, e))?;
        }

        let mut attempt = DownloadAttempt::new(target);
        let mut last_error: Option<String> = None;

        while let Some(url) = selector.select(file, attempt.retry_count()) {
            let retry = attempt.retry_count();
            wait_before_attempt(retry).await;
            debug!(file, %url, retry, "Download attempt");

            match self.fetch_once(&url, attempt.temp_path()).await {
                Ok(bytes) => {
                    attempt.finalize().await?;
                    info!(file, %url, bytes, attempts = retry + 1, "Downloaded");
                    return Ok(DownloadOutcome {
                        url,
                        bytes,
                        attempts: retry + 1,
                    });
                }
                Err(e) => {
                    warn!(file, %url, retry, error = %e, "Download attempt failed");
                    attempt.discard().await;
                    last_error = Some(e.to_string());
                    attempt.advance();
                }
            }
        }

        Err(UpdateError::ExhaustedMirrors {
            file: file.to_string(),
            attempts: attempt.retry_count(),
            last_error,
        })
    }

    async fn fetch_once(&self, url: &str, part: &Path) -> Result<u64> {
        let fetch = self.transport.fetch(url, part, self.progress.as_ref());

        match self.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, fetch).await.unwrap_or_else(|_| {
                self.progress.finish();
                Err(UpdateError::Transfer {
                    url: url.to_string(),
                    reason: format!("timed out after {}s", limit.as_secs_f64()),
                })
            }),
            None => fetch.await,
        }
    }
}
