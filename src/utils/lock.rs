//! Single-instance lock for the update loop.
//!
//! The manifest and bundle files are only safe because exactly one cycle
//! touches them at a time. Inside a process the scheduler guarantees that;
//! across processes an exclusive advisory lock on
//! `<data_dir>/.locks/<name>.lock` does.

use crate::core::{Result, UpdateError};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Exclusive lock held for the lifetime of the value.
#[derive(Debug)]
pub struct InstanceLock {
    _file: Arc<File>,
    lock_path: PathBuf,
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        debug!(path = %self.lock_path.display(), "Instance lock released");
        if let Err(e) = std::fs::remove_file(&self.lock_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            debug!(path = %self.lock_path.display(), error = %e, "Failed to remove lock file");
        }
    }
}

impl InstanceLock {
    /// Try to take the lock without waiting.
    ///
    /// # Errors
    ///
    /// [`UpdateError::AlreadyRunning`] when another process holds it, or
    /// [`UpdateError::Io`] when the lock file cannot be created.
    pub async fn acquire(data_dir: &Path, name: &str) -> Result<Self> {
        let locks_dir = data_dir.join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await?;

        let lock_path = locks_dir.join(format!("{name}.lock"));

        let open_path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .map_err(|e| UpdateError::Io(std::io::Error::other(e)))??;
        let file = Arc::new(file);

        let locker = Arc::clone(&file);
        let locked = tokio::task::spawn_blocking(move || locker.try_lock_exclusive())
            .await
            .map_err(|e| UpdateError::Io(std::io::Error::other(e)))?;

        match locked {
            Ok(true) => {
                debug!(path = %lock_path.display(), "Instance lock acquired");
                Ok(Self {
                    _file: file,
                    lock_path,
                })
            }
            Ok(false) | Err(_) => Err(UpdateError::AlreadyRunning {
                path: lock_path.display().to_string(),
            }),
        }
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.lock_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lock_acquire_and_release() {
        let temp_dir = TempDir::new().unwrap();

        let lock = InstanceLock::acquire(temp_dir.path(), "updater").await.unwrap();
        let lock_path = temp_dir.path().join(".locks").join("updater.lock");
        assert_eq!(lock.path(), lock_path);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn test_second_acquire_fails_while_held() {
        let temp_dir = TempDir::new().unwrap();

        let _held = InstanceLock::acquire(temp_dir.path(), "updater").await.unwrap();
        let second = InstanceLock::acquire(temp_dir.path(), "updater").await;
        assert!(matches!(second, Err(UpdateError::AlreadyRunning { .. })));
    }
}
