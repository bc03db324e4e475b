use crate::core::{Result, UpdateError};
use crate::download::Transport;
use crate::restart::{Clock, ConfirmDialog, Notifier, Relauncher, RestartChoice};
use crate::utils::ProgressReporter;
use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Response {
    Body(Vec<u8>),
    Fail(String),
    Truncated {
        partial: Vec<u8>,
        reason: String,
    },
    Hang,
}

/// In-memory [`Transport`].
///
/// URLs without a registered response fail like an HTTP 404.
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: Mutex<HashMap<String, Response>>,
    requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    /// Transport with no registered URLs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn serve(&self, url: &str, body: Vec<u8>) {
        self.set(url, Response::Body(body));
    }

    /// Fail every request for `url` with `reason`.
    pub fn fail(&self, url: &str, reason: &str) {
        self.set(url, Response::Fail(reason.to_string()));
    }

    /// Write `partial` for `url`, then fail with `reason`.
    pub fn truncate(&self, url: &str, partial: Vec<u8>, reason: &str) {
        self.set(
            url,
            Response::Truncated {
                partial,
                reason: reason.to_string(),
            },
        );
    }

    /// Never complete requests for `url`.
    pub fn hang(&self, url: &str) {
        self.set(url, Response::Hang);
    }

    /// Forget any response registered for `url`.
    pub fn remove(&self, url: &str) {
        self.responses.lock().unwrap().remove(url);
    }

    /// Every requested URL, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|requested| *requested == url).count()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn set(&self, url: &str, response: Response) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }
}

impl Transport for FakeTransport {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        progress: &'a dyn ProgressReporter,
    ) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(url.to_string());
            let response = self.responses.lock().unwrap().get(url).cloned();

            let transfer_error = |reason: String| UpdateError::Transfer {
                url: url.to_string(),
                reason,
            };

            match response {
                None => Err(transfer_error("HTTP status 404 Not Found".to_string())),
                Some(Response::Fail(reason)) => Err(transfer_error(reason)),
                Some(Response::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(transfer_error("hung".to_string()))
                }
                Some(Response::Truncated {
                    partial,
                    reason,
                }) => {
                    tokio::fs::write(dest, &partial).await?;
                    Err(transfer_error(reason))
                }
                Some(Response::Body(body)) => {
                    let len = body.len() as u64;
                    progress.begin(url, Some(len));
                    tokio::fs::write(dest, &body).await?;
                    progress.advance(len);
                    progress.finish();
                    Ok(len)
                }
            }
        })
    }
}

/// Manually advanced [`Clock`].
#[derive(Debug)]
pub struct FakeClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl FakeClock {
    /// Clock frozen at the moment of creation.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.offset.lock().unwrap() += by;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }
}

/// [`Notifier`] that records notifications.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<(String, String)>>,
    unsupported: AtomicBool,
}

impl RecordingNotifier {
    /// Simulate a platform with or without notification support.
    pub fn set_supported(&self, supported: bool) {
        self.unsupported.store(!supported, Ordering::SeqCst);
    }

    /// Number of notify calls.
    pub fn count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }

    /// Titles of every notify call.
    pub fn titles(&self) -> Vec<String> {
        self.shown.lock().unwrap().iter().map(|(title, _)| title.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) -> bool {
        self.shown.lock().unwrap().push((title.to_string(), body.to_string()));
        !self.unsupported.load(Ordering::SeqCst)
    }
}

/// [`ConfirmDialog`] answering from a script, then a fallback.
#[derive(Debug)]
pub struct ScriptedDialog {
    script: Mutex<VecDeque<RestartChoice>>,
    fallback: RestartChoice,
    asked: AtomicUsize,
}

impl ScriptedDialog {
    /// Always answer `choice`.
    pub fn always(choice: RestartChoice) -> Self {
        Self::scripted(Vec::new(), choice)
    }

    /// Answer `script` in order, then `fallback`.
    pub fn scripted(script: Vec<RestartChoice>, fallback: RestartChoice) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            asked: AtomicUsize::new(0),
        }
    }

    /// Number of times the dialog was shown.
    pub fn count(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedDialog {
    fn default() -> Self {
        Self::always(RestartChoice::Later)
    }
}

impl ConfirmDialog for ScriptedDialog {
    fn confirm(&self, _title: &str, _message: &str) -> RestartChoice {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().pop_front().unwrap_or(self.fallback)
    }
}

/// [`Relauncher`] that counts calls instead of exiting.
#[derive(Debug, Default)]
pub struct RecordingRelauncher {
    calls: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl RecordingRelauncher {
    /// Make every relaunch fail with `reason`.
    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    /// Number of relaunch calls.
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Relauncher for RecordingRelauncher {
    fn relaunch(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().unwrap().clone() {
            Some(reason) => Err(UpdateError::Relaunch {
                reason,
            }),
            None => Ok(()),
        }
    }
}
