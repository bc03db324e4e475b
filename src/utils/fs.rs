//! File system helpers for crash-safe writes.
//!
//! Everything the updater persists goes through a write-to-temp-then-rename
//! sequence so a reader never observes a half-written file: either the old
//! content or the new content is visible, nothing in between.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Append `.{suffix}` to the full file name, keeping any existing extension.
///
/// `release.json` with suffix `remote` becomes `release.json.remote`.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Create a directory and all of its parents if missing.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write `content` to `path` atomically.
///
/// The bytes go to a sibling `.tmp` file which is synced and then renamed over
/// `path`. Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = with_suffix(path, "tmp");

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Async wrapper around [`atomic_write`] running on the blocking pool.
pub async fn atomic_write_async(path: &Path, content: Vec<u8>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || atomic_write(&path, &content))
        .await
        .context("Atomic write task panicked")?
}

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` when a file was actually removed.
pub async fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_with_suffix_keeps_extension() {
        let path = Path::new("/data/abyui-release.json");
        assert_eq!(with_suffix(path, "remote"), PathBuf::from("/data/abyui-release.json.remote"));
        assert_eq!(with_suffix(Path::new("app"), "part"), PathBuf::from("app.part"));
    }

    #[test]
    fn test_atomic_write_creates_parent() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("deep").join("nested").join("atomic.txt");

        atomic_write(&file, b"nested content").unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "nested content");
        assert!(!with_suffix(&file, "tmp").exists());
    }

    #[test]
    fn test_atomic_write_overwrites() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("atomic.txt");

        atomic_write(&file, b"initial").unwrap();
        atomic_write(&file, b"updated").unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "updated");
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("gone.txt");

        assert!(!remove_if_exists(&file).await.unwrap());

        std::fs::write(&file, "x").unwrap();
        assert!(remove_if_exists(&file).await.unwrap());
        assert!(!file.exists());
    }
}
