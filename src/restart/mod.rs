//! Restart negotiation.
//!
//! Once a bundle is staged the user is asked to restart into it. The prompt is
//! throttled: after a prompt has been shown, further requests within the
//! cooldown window (10 minutes by default) are ignored, whatever the user
//! answered. The window restarts only when a prompt is actually shown, and
//! resets only with the process.
//!
//! A prompt consists of a best-effort desktop notification followed by a
//! blocking confirmation with two choices, "Restart now" and "Later".
//! Choosing to restart re-executes the process with the relaunch marker and
//! exits with status 0.
//!
//! Every platform interaction goes through a trait so the negotiator can be
//! driven deterministically in tests:
//!
//! - [`Clock`] for the cooldown
//! - [`Notifier`] for the notification
//! - [`ConfirmDialog`] for the question
//! - [`Relauncher`] for re-exec and exit

mod desktop;

pub use desktop::{
    AppleScriptDialog, DesktopNotifier, NeverDialog, ProcessRelauncher, RfdDialog, TerminalDialog,
};
pub(crate) use desktop::{applescript_string, native_dialog_needs_main_thread};

use crate::core::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Notification title shown when a bundle is staged.
pub const NOTIFICATION_TITLE: &str = "New version downloaded";
/// Notification body shown when a bundle is staged.
pub const NOTIFICATION_BODY: &str = "Restart to apply the update";
/// Confirmation dialog title.
pub const DIALOG_TITLE: &str = "Restart required";
/// Confirmation dialog message.
pub const DIALOG_MESSAGE: &str = "The update was downloaded in the background and takes effect after a restart. Restart now?";
/// Label of the default button.
pub const RESTART_NOW_LABEL: &str = "Restart now";
/// Label of the cancel button.
pub const LATER_LABEL: &str = "Later";

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// [`Clock`] backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Shows a non-blocking desktop notification.
pub trait Notifier: Send + Sync {
    /// Returns `false` when notifications are unsupported; never fails.
    fn notify(&self, title: &str, body: &str) -> bool;
}

/// The user's answer to the restart question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartChoice {
    /// Relaunch into the new bundle immediately.
    RestartNow,
    /// Keep running; ask again after the cooldown.
    Later,
}

/// Blocking two-choice confirmation.
///
/// Called from the blocking thread pool, so implementations may block.
pub trait ConfirmDialog: Send + Sync {
    /// Ask the question; dismissal counts as [`RestartChoice::Later`].
    fn confirm(&self, title: &str, message: &str) -> RestartChoice;
}

/// Re-executes the process and exits.
pub trait Relauncher: Send + Sync {
    /// Start the new process and terminate this one with status 0.
    ///
    /// Only returns in tests or on failure.
    fn relaunch(&self) -> Result<()>;
}

/// How the restart question is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    /// Native message box: `rfd`, or `osascript` on macOS.
    #[default]
    Dialog,
    /// Question on the controlling terminal.
    Terminal,
    /// Never ask; always answer "Later".
    Never,
}

impl PromptMode {
    /// The dialog implementation for this mode.
    pub fn dialog(self) -> Arc<dyn ConfirmDialog> {
        match self {
            Self::Dialog if native_dialog_needs_main_thread() => Arc::new(AppleScriptDialog),
            Self::Dialog => Arc::new(RfdDialog),
            Self::Terminal => Arc::new(TerminalDialog),
            Self::Never => Arc::new(NeverDialog),
        }
    }
}

/// What a call to [`RestartNegotiator::prompt_restart`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Within the cooldown window; nothing shown.
    Throttled,
    /// Prompt shown and the user chose "Later".
    Deferred,
    /// Prompt shown and the relaunch was requested.
    Relaunched,
    /// Prompt shown, restart chosen, but the relaunch failed.
    RelaunchFailed,
}

/// Throttled restart prompt.
pub struct RestartNegotiator {
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    dialog: Arc<dyn ConfirmDialog>,
    relauncher: Arc<dyn Relauncher>,
    cooldown: Duration,
    last_prompt: Option<Instant>,
}

impl RestartNegotiator {
    /// Negotiator with the given collaborators and cooldown.
    pub fn new(
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        dialog: Arc<dyn ConfirmDialog>,
        relauncher: Arc<dyn Relauncher>,
        cooldown: Duration,
    ) -> Self {
        Self {
            clock,
            notifier,
            dialog,
            relauncher,
            cooldown,
            last_prompt: None,
        }
    }

    /// When the last prompt was shown, if ever.
    pub fn last_prompt(&self) -> Option<Instant> {
        self.last_prompt
    }

    /// Whether a prompt would currently be suppressed.
    pub fn is_throttled(&self) -> bool {
        self.last_prompt
            .is_some_and(|last| self.clock.now().saturating_duration_since(last) < self.cooldown)
    }

    /// Offer a restart unless a prompt was shown within the cooldown window.
    pub async fn prompt_restart(&mut self) -> PromptOutcome {
        if self.is_throttled() {
            debug!("Restart prompt suppressed by cooldown");
            return PromptOutcome::Throttled;
        }

        if !self.notifier.notify(NOTIFICATION_TITLE, NOTIFICATION_BODY) {
            debug!("Desktop notifications unsupported");
        }

        let dialog = Arc::clone(&self.dialog);
        let choice =
            tokio::task::spawn_blocking(move || dialog.confirm(DIALOG_TITLE, DIALOG_MESSAGE))
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Restart dialog failed, treating as Later");
                    RestartChoice::Later
                });

        self.last_prompt = Some(self.clock.now());

        match choice {
            RestartChoice::Later => {
                info!("Restart deferred by user");
                PromptOutcome::Deferred
            }
            RestartChoice::RestartNow => {
                info!("Restarting into the new bundle");
                match self.relauncher.relaunch() {
                    Ok(()) => PromptOutcome::Relaunched,
                    Err(e) => {
                        warn!(error = %e, "Relaunch failed");
                        PromptOutcome::RelaunchFailed
                    }
                }
            }
        }
    }
}
