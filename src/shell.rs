//! Process-level fatal error handling.
//!
//! A panic anywhere in the updater is unrecoverable: it is logged, shown to
//! the user in a blocking error dialog, and the process exits with
//! [`FATAL_EXIT_CODE`]. The previous panic hook still runs first so the usual
//! message and backtrace reach stderr.

use crate::constants::FATAL_EXIT_CODE;
use crate::restart::{applescript_string, native_dialog_needs_main_thread};
use std::any::Any;
use std::panic::{Location, PanicHookInfo};
use std::process::{Command, Stdio};
use tracing::error;

/// Title of the fatal error dialog.
pub const FATAL_DIALOG_TITLE: &str = "An error occurred, the updater will exit";

/// Install the fatal panic handler for the whole process.
///
/// `show_dialog` is false for headless runs; the error is then only logged.
pub fn install_fatal_handler(show_dialog: bool) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);

        let report = panic_report(info);
        error!(exit_code = FATAL_EXIT_CODE, "{report}");

        if show_dialog {
            show_fatal_dialog(&report);
        }

        std::process::exit(FATAL_EXIT_CODE);
    }));
}

/// Blocking error dialog that is safe on whichever thread panicked.
fn show_fatal_dialog(report: &str) {
    if native_dialog_needs_main_thread() {
        let status = Command::new("osascript")
            .arg("-e")
            .arg(fatal_alert_script(report))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = status {
            error!(error = %e, "Cannot show fatal error dialog");
        }
        return;
    }

    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(FATAL_DIALOG_TITLE)
        .set_description(report)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

fn fatal_alert_script(report: &str) -> String {
    format!(
        "display alert {} message {} as critical",
        applescript_string(FATAL_DIALOG_TITLE),
        applescript_string(report)
    )
}

/// Panic message with its source location.
pub(crate) fn panic_report(info: &PanicHookInfo<'_>) -> String {
    format_report(info.payload(), info.location())
}

fn format_report(payload: &(dyn Any + Send), location: Option<&Location<'_>>) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    match location {
        Some(location) => {
            format!("{message}\n  at {}:{}:{}", location.file(), location.line(), location.column())
        }
        None => message,
    }
}
