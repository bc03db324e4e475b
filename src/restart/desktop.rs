//! Platform implementations of the restart collaborators.

use super::{ConfirmDialog, LATER_LABEL, Notifier, RESTART_NOW_LABEL, Relauncher, RestartChoice};
use crate::constants::RELAUNCH_FLAG;
use crate::core::{Result, UpdateError};
use std::ffi::OsString;
use std::io::{BufRead, IsTerminal, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use tracing::debug;

/// Whether `rfd` message boxes only work on the main thread of a running
/// application. True on macOS, where AppKit panics otherwise.
pub(crate) const fn native_dialog_needs_main_thread() -> bool {
    cfg!(target_os = "macos")
}

/// Native message box via `rfd`.
///
/// Not usable from worker threads on macOS; see [`AppleScriptDialog`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RfdDialog;

impl ConfirmDialog for RfdDialog {
    fn confirm(&self, title: &str, message: &str) -> RestartChoice {
        let result = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Info)
            .set_title(title)
            .set_description(message)
            .set_buttons(rfd::MessageButtons::OkCancelCustom(
                RESTART_NOW_LABEL.to_string(),
                LATER_LABEL.to_string(),
            ))
            .show();

        match result {
            rfd::MessageDialogResult::Ok | rfd::MessageDialogResult::Yes => {
                RestartChoice::RestartNow
            }
            rfd::MessageDialogResult::Custom(label) if label == RESTART_NOW_LABEL => {
                RestartChoice::RestartNow
            }
            _ => RestartChoice::Later,
        }
    }
}

/// Native dialog shown by a separate `osascript` process.
///
/// Works from any thread, which is what a headless updater on macOS needs.
/// Pressing "Later", closing the dialog or a missing `osascript` all answer "Later".
#[derive(Debug, Default, Clone, Copy)]
pub struct AppleScriptDialog;

impl ConfirmDialog for AppleScriptDialog {
    fn confirm(&self, title: &str, message: &str) -> RestartChoice {
        let output = Command::new("osascript")
            .arg("-e")
            .arg(confirm_script(title, message))
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(output) if output.status.success() => {
                parse_dialog_reply(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(_) => RestartChoice::Later,
            Err(e) => {
                debug!(error = %e, "osascript unavailable, deferring restart");
                RestartChoice::Later
            }
        }
    }
}

/// Quote `text` as an AppleScript string literal.
pub(crate) fn applescript_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn confirm_script(title: &str, message: &str) -> String {
    let later = applescript_string(LATER_LABEL);
    let restart = applescript_string(RESTART_NOW_LABEL);
    format!(
        "display dialog {} with title {} buttons {{{later}, {restart}}} default button {restart} cancel button {later}",
        applescript_string(message),
        applescript_string(title),
    )
}

fn parse_dialog_reply(stdout: &str) -> RestartChoice {
    match stdout.trim().strip_prefix("button returned:") {
        Some(label) if label == RESTART_NOW_LABEL => RestartChoice::RestartNow,
        _ => RestartChoice::Later,
    }
}

/// Asks on the controlling terminal. Without a terminal the answer is "Later".
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalDialog;

impl ConfirmDialog for TerminalDialog {
    fn confirm(&self, title: &str, message: &str) -> RestartChoice {
        if !std::io::stdin().is_terminal() {
            debug!("No terminal attached, deferring restart");
            return RestartChoice::Later;
        }

        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{title}\n{message} [Y/n] ");
        let _ = stderr.flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => RestartChoice::Later,
            Ok(_) => parse_answer(&answer),
        }
    }
}

fn parse_answer(answer: &str) -> RestartChoice {
    match answer.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => RestartChoice::RestartNow,
        _ => RestartChoice::Later,
    }
}

/// Never prompts; every request is answered with "Later".
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverDialog;

impl ConfirmDialog for NeverDialog {
    fn confirm(&self, _title: &str, _message: &str) -> RestartChoice {
        RestartChoice::Later
    }
}

/// Notifications through the platform's command line notifier.
///
/// `notify-send` on Linux and the BSDs, `osascript` on macOS. Other platforms
/// report notifications as unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> bool {
        let Some(command) = notification_command(title, body) else {
            return false;
        };

        match spawn_reaped(command) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Notification command unavailable");
                false
            }
        }
    }
}

/// Start `command` detached from stdio and wait for it on a helper thread.
///
/// The returned handle yields the exit status once the child has been reaped.
fn spawn_reaped(mut command: Command) -> std::io::Result<JoinHandle<Option<ExitStatus>>> {
    let mut child =
        command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null()).spawn()?;

    std::thread::Builder::new().name("notify-reaper".to_string()).spawn(move || {
        match child.wait() {
            Ok(status) => Some(status),
            Err(e) => {
                debug!(error = %e, "Failed to wait for notification command");
                None
            }
        }
    })
}

#[cfg(target_os = "macos")]
fn notification_command(title: &str, body: &str) -> Option<Command> {
    let script = format!(
        "display notification {} with title {}",
        applescript_string(body),
        applescript_string(title)
    );
    let mut command = Command::new("osascript");
    command.arg("-e").arg(script);
    Some(command)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn notification_command(title: &str, body: &str) -> Option<Command> {
    let mut command = Command::new("notify-send");
    command.arg(title).arg(body);
    Some(command)
}

#[cfg(not(unix))]
fn notification_command(_title: &str, _body: &str) -> Option<Command> {
    None
}

/// Re-executes the current binary with the relaunch marker, then exits with 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRelauncher;

impl Relauncher for ProcessRelauncher {
    fn relaunch(&self) -> Result<()> {
        let exe = std::env::current_exe().map_err(|e| UpdateError::Relaunch {
            reason: format!("cannot locate executable: {e}"),
        })?;
        let args = relaunch_args(std::env::args_os().skip(1));

        debug!(exe = %exe.display(), ?args, "Relaunching");
        Command::new(&exe).args(&args).spawn().map_err(|e| UpdateError::Relaunch {
            reason: format!("failed to start {}: {e}", exe.display()),
        })?;

        std::process::exit(0)
    }
}

/// Original arguments with the relaunch marker appended once.
pub(crate) fn relaunch_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();
    if !args.iter().any(|arg| arg == RELAUNCH_FLAG) {
        args.push(OsString::from(RELAUNCH_FLAG));
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaunch_args_appends_marker() {
        let args = relaunch_args(vec![OsString::from("run"), OsString::from("-v")]);
        assert_eq!(args, vec!["run", "-v", "--relaunch"]);
    }

    #[test]
    fn test_relaunch_args_marker_not_duplicated() {
        let args = relaunch_args(vec![OsString::from("--relaunch"), OsString::from("run")]);
        assert_eq!(args, vec!["--relaunch", "run"]);
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("\n"), RestartChoice::RestartNow);
        assert_eq!(parse_answer("Y\n"), RestartChoice::RestartNow);
        assert_eq!(parse_answer("yes"), RestartChoice::RestartNow);
        assert_eq!(parse_answer("n"), RestartChoice::Later);
        assert_eq!(parse_answer("later"), RestartChoice::Later);
    }

    #[test]
    fn test_never_dialog() {
        assert_eq!(NeverDialog.confirm("t", "m"), RestartChoice::Later);
    }

    #[test]
    fn test_applescript_string_escapes() {
        assert_eq!(applescript_string("plain"), "\"plain\"");
        assert_eq!(applescript_string(r#"say "hi" \ bye"#), r#""say \"hi\" \\ bye""#);
    }

    #[test]
    fn test_confirm_script_defaults_to_restart() {
        let script = confirm_script("Restart required", "Restart now?");
        assert_eq!(
            script,
            r#"display dialog "Restart now?" with title "Restart required" buttons {"Later", "Restart now"} default button "Restart now" cancel button "Later""#
        );
    }

    #[test]
    fn test_parse_dialog_reply() {
        assert_eq!(parse_dialog_reply("button returned:Restart now\n"), RestartChoice::RestartNow);
        assert_eq!(parse_dialog_reply("button returned:Later\n"), RestartChoice::Later);
        assert_eq!(parse_dialog_reply(""), RestartChoice::Later);
    }

    #[test]
    fn test_dialog_mode_off_main_thread_on_macos() {
        assert_eq!(native_dialog_needs_main_thread(), cfg!(target_os = "macos"));
    }

    #[cfg(unix)]
    #[test]
    fn test_notification_child_is_reaped() {
        let reaper = spawn_reaped(Command::new("true")).unwrap();
        let status = reaper.join().unwrap();
        assert!(status.is_some_and(|status| status.success()));
    }
}
