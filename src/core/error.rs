//! Error handling for the updater
//!
//! The update pipeline reports failures through a single strongly-typed enum,
//! [`UpdateError`]. Each variant maps to one failure class of the pipeline so the
//! scheduler can log it precisely and turn it into a reschedule decision:
//!
//! - **Manifest**: [`UpdateError::ManifestRead`], [`UpdateError::ManifestInvalid`]
//! - **Transfer**: [`UpdateError::Transfer`], [`UpdateError::ExhaustedMirrors`]
//! - **Install**: [`UpdateError::Stream`], [`UpdateError::Integrity`], [`UpdateError::Commit`]
//! - **Process**: [`UpdateError::AlreadyRunning`], [`UpdateError::Relaunch`], [`UpdateError::Config`]
//!
//! Outside the pipeline (CLI, config loading) errors travel as [`anyhow::Error`];
//! [`user_friendly_error`] turns either kind into an [`ErrorContext`] with a
//! suggestion for the terminal.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundle_updater::core::{UpdateError, user_friendly_error};
//!
//! let err = UpdateError::ExhaustedMirrors {
//!     file: "abyui-release.json".to_string(),
//!     attempts: 5,
//!     last_error: Some("connection reset".to_string()),
//! };
//! user_friendly_error(anyhow::Error::from(err)).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Failure classes of the update pipeline.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The local manifest is missing or unparsable.
    ///
    /// Never fatal: the scheduler treats it as "no update has been applied yet".
    #[error("Local manifest {path} could not be read: {reason}")]
    ManifestRead {
        /// Path of the local manifest
        path: String,
        /// Underlying read or parse failure
        reason: String,
    },

    /// The downloaded remote manifest does not match the manifest schema.
    #[error("Remote manifest {path} is invalid: {reason}")]
    ManifestInvalid {
        /// Path of the downloaded manifest copy
        path: String,
        /// Parse failure
        reason: String,
    },

    /// A single transfer attempt against one URL failed.
    #[error("Transfer from {url} failed: {reason}")]
    Transfer {
        /// URL of the attempt
        url: String,
        /// Network, HTTP status or timeout description
        reason: String,
    },

    /// Every mirror was tried for one download and none delivered the file.
    #[error("All mirrors exhausted for '{file}' after {attempts} attempt(s)")]
    ExhaustedMirrors {
        /// Logical file name being downloaded
        file: String,
        /// Number of attempts made
        attempts: u32,
        /// Error of the final attempt, if any attempt was made
        last_error: Option<String>,
    },

    /// Reading, decompressing or writing a file stream failed.
    #[error("Stream error while {operation} {path}: {reason}")]
    Stream {
        /// What was being done ("decompressing", "writing", ...)
        operation: String,
        /// File involved
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// The decompressed bundle does not hash to the manifest's hash.
    #[error("Bundle integrity check failed: expected {expected}, got {actual}")]
    Integrity {
        /// Hash advertised by the manifest
        expected: String,
        /// Hash computed over the decompressed bundle
        actual: String,
    },

    /// Swapping the remote manifest into place failed.
    #[error("Manifest commit failed: {reason}")]
    Commit {
        /// Underlying failure
        reason: String,
    },

    /// The updater configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Another process holds the single-instance lock.
    #[error("Another updater instance is already running (lock: {path})")]
    AlreadyRunning {
        /// Lock file path
        path: String,
    },

    /// Spawning the relaunched process failed.
    #[error("Failed to relaunch into the new bundle: {reason}")]
    Relaunch {
        /// Underlying failure
        reason: String,
    },

    /// Any other I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpdateError {
    /// Build a [`UpdateError::Stream`] from an I/O failure on `path`.
    pub fn stream(operation: &str, path: &std::path::Path, err: impl fmt::Display) -> Self {
        Self::Stream {
            operation: operation.to_string(),
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Short, stable name of the failure class, used as a log field.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ManifestRead { .. } => "manifest_read",
            Self::ManifestInvalid { .. } => "manifest_invalid",
            Self::Transfer { .. } => "transfer",
            Self::ExhaustedMirrors { .. } => "exhausted_mirrors",
            Self::Stream { .. } => "stream",
            Self::Integrity { .. } => "integrity",
            Self::Commit { .. } => "commit",
            Self::Config { .. } => "config",
            Self::AlreadyRunning { .. } => "already_running",
            Self::Relaunch { .. } => "relaunch",
            Self::Io(_) => "io",
        }
    }
}

/// Result alias for pipeline operations.
pub type Result<T, E = UpdateError> = std::result::Result<T, E>;

/// An error message decorated with optional details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The primary message
    pub message: String,
    /// Suggested remedy
    pub suggestion: Option<String>,
    /// Additional explanation
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.downcast_ref::<UpdateError>() {
        return create_error_context(update_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(error.to_string())
                    .with_suggestion(
                        "Check that the updater can write next to the executable (data and resources directories)",
                    );
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(error.to_string())
                    .with_suggestion("Check that the configured paths exist");
            }
            _ => {}
        }
    }

    let mut chain = error.chain().skip(1).map(ToString::to_string).peekable();
    let details = if chain.peek().is_some() {
        Some(chain.collect::<Vec<_>>().join(": "))
    } else {
        None
    };

    let ctx = ErrorContext::new(error.to_string());
    match details {
        Some(details) => ctx.with_details(details),
        None => ctx,
    }
}

fn create_error_context(error: &UpdateError) -> ErrorContext {
    let ctx = ErrorContext::new(error.to_string());
    match error {
        UpdateError::ExhaustedMirrors { last_error, .. } => {
            let ctx = ctx.with_suggestion(
                "Check your network connection; the next cycle retries automatically",
            );
            match last_error {
                Some(last) => ctx.with_details(format!("Last attempt: {last}")),
                None => ctx,
            }
        }
        UpdateError::AlreadyRunning { .. } => ctx.with_suggestion("Close the other instance or wait for it to exit"),
        UpdateError::Config { .. } => ctx.with_suggestion(
            "Run `bundle-updater config show` to inspect the effective configuration",
        ),
        UpdateError::Integrity { .. } => ctx
            .with_details("The staged bundle was left in place but the manifest was not committed")
            .with_suggestion("Set `integrity = \"skip\"` if the release host publishes non-SHA-256 hashes"),
        UpdateError::Stream { .. } | UpdateError::Commit { .. } => ctx.with_suggestion("Check free disk space and permissions of the resources directory"),
        _ => ctx,
    }
}
