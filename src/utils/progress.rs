//! Download progress reporting.
//!
//! The pipeline reports byte progress through the [`ProgressReporter`] trait so
//! the core never depends on how (or whether) progress is shown. The CLI uses
//! [`TerminalProgress`], an `indicatif` bar; background runs use [`NoProgress`].
//!
//! Progress bars are hidden when `BUNDLE_UPDATER_NO_PROGRESS` is set, mirroring
//! the `--no-progress` flag.

use crate::constants::NO_PROGRESS_ENV_VAR;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Receives progress events for one transfer at a time.
pub trait ProgressReporter: Send + Sync {
    /// A transfer of `label` started; `total` is the expected size if known.
    fn begin(&self, label: &str, total: Option<u64>);

    /// `bytes` more bytes arrived.
    fn advance(&self, bytes: u64);

    /// The transfer ended, successfully or not.
    fn finish(&self);
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn begin(&self, _label: &str, _total: Option<u64>) {}

    fn advance(&self, _bytes: u64) {}

    fn finish(&self) {}
}

/// Returns true when progress display has been disabled via the environment.
pub fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV_VAR).is_some()
}

/// Terminal progress bar backed by `indicatif`.
///
/// ```text
/// app.asar.gz [━━━━━━━━━━━━━━━━━━━━╸━━━━━━━━━━━━━━━━━━━] 2.1MB/4.3MB (00:05)
/// ```
#[derive(Debug, Default)]
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalProgress {
    /// Create a reporter; no bar is drawn until a transfer begins.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for TerminalProgress {
    fn begin(&self, label: &str, total: Option<u64>) {
        let bar = if is_progress_disabled() {
            ProgressBar::hidden()
        } else {
            match total {
                Some(len) => {
                    let bar = ProgressBar::new(len);
                    bar.set_style(download_style());
                    bar
                }
                None => {
                    let bar = ProgressBar::new_spinner();
                    bar.set_style(spinner_style());
                    bar
                }
            }
        };
        bar.set_prefix(label.to_string());

        if let Ok(mut slot) = self.bar.lock() {
            if let Some(previous) = slot.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn advance(&self, bytes: u64) {
        if let Ok(slot) = self.bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            bar.inc(bytes);
        }
    }

    fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_and_clear();
        }
    }
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {bytes}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_progress_lifecycle() {
        let progress = TerminalProgress::new();
        progress.begin("app.asar.gz", Some(10));
        progress.advance(4);
        progress.advance(6);
        progress.finish();
        assert!(progress.bar.lock().unwrap().is_none());
    }

    #[test]
    fn test_progress_without_begin_is_noop() {
        let progress = TerminalProgress::new();
        progress.advance(10);
        progress.finish();
    }
}
