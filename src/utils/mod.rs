//! Utility modules supporting the update pipeline.
//!
//! - [`fs`]: atomic writes and tolerant removals
//! - [`backoff`]: delays between download attempts
//! - [`lock`]: cross-process single-instance lock
//! - [`progress`]: progress reporting seam and terminal implementation

pub mod backoff;
pub mod fs;
pub mod lock;
pub mod progress;

pub use fs::{atomic_write, atomic_write_async, ensure_dir, remove_if_exists, with_suffix};
pub use lock::InstanceLock;
pub use progress::{NoProgress, ProgressReporter, TerminalProgress};
