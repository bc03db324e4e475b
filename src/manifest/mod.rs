//! Release manifest model and on-disk store.
//!
//! A manifest describes one release of the application bundle:
//!
//! ```json
//! {
//!   "client": {
//!     "hash": "3f2a...",
//!     "app": { "urls": ["https://cdn-a/app.asar.gz", "https://cdn-b/app.asar.gz"] }
//!   }
//! }
//! ```
//!
//! Two copies live side by side in the data directory: the local manifest
//! (the last release that was fully staged) and `<local>.remote`, the copy
//! downloaded during the current cycle. The local copy is either absent or a
//! complete document, never half-written:
//!
//! - downloads land in `<local>.remote` only after the transfer completed;
//! - [`ManifestStore::commit_remote`] removes the local copy and renames the
//!   remote copy into its place.
//!
//! A crash between those two steps leaves no local manifest, which reads as
//! "no update applied yet" and simply causes a re-download on the next cycle.

use crate::constants::REMOTE_MANIFEST_SUFFIX;
use crate::core::{Result, UpdateError};
use crate::utils::{atomic_write_async, remove_if_exists, with_suffix};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// A release manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// The client bundle release
    pub client: ClientRelease,
}

/// Bundle release details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRelease {
    /// Content hash identifying the release
    pub hash: String,
    /// Where to fetch the bundle archive
    pub app: BundleSource,
}

/// Ordered CDN locations of the compressed bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BundleSource {
    /// URLs tried in order, one per retry
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Manifest {
    /// Build a manifest from its parts.
    pub fn new(hash: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            client: ClientRelease {
                hash: hash.into(),
                app: BundleSource {
                    urls,
                },
            },
        }
    }

    /// Parse a manifest document.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The release hash.
    pub fn hash(&self) -> &str {
        &self.client.hash
    }

    /// Ordered bundle archive URLs.
    pub fn bundle_urls(&self) -> &[String] {
        &self.client.app.urls
    }

    /// Whether `remote` describes a different release than `local`.
    ///
    /// An absent local manifest always requires an update.
    pub fn requires_update(local: Option<&Manifest>, remote: &Manifest) -> bool {
        local.is_none_or(|local| local.hash() != remote.hash())
    }
}

/// Paths of the local manifest and its downloaded remote copy.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    local: PathBuf,
    remote: PathBuf,
}

impl ManifestStore {
    /// Store for the local manifest at `local`; the remote copy sits at `<local>.remote`.
    pub fn new(local: impl Into<PathBuf>) -> Self {
        let local = local.into();
        let remote = with_suffix(&local, REMOTE_MANIFEST_SUFFIX);
        Self {
            local,
            remote,
        }
    }

    /// Path of the local manifest.
    pub fn local_path(&self) -> &Path {
        &self.local
    }

    /// Path where the remote manifest is downloaded to.
    pub fn remote_path(&self) -> &Path {
        &self.remote
    }

    /// Read and parse the local manifest.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ManifestRead`] when the file is missing or unparsable.
    pub async fn read_local(&self) -> Result<Manifest> {
        let content =
            fs::read_to_string(&self.local).await.map_err(|e| UpdateError::ManifestRead {
                path: self.local.display().to_string(),
                reason: e.to_string(),
            })?;

        Manifest::from_json(&content).map_err(|e| UpdateError::ManifestRead {
            path: self.local.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Local manifest, or `None` when it cannot be read for any reason.
    pub async fn load_local(&self) -> Option<Manifest> {
        match self.read_local().await {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                debug!(error = %e, "No usable local manifest, treating as never updated");
                None
            }
        }
    }

    /// Read and parse the downloaded remote manifest.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ManifestInvalid`] when the document does not parse,
    /// [`UpdateError::Io`] when it cannot be read.
    pub async fn read_remote(&self) -> Result<Manifest> {
        let content = fs::read_to_string(&self.remote).await?;
        Manifest::from_json(&content).map_err(|e| UpdateError::ManifestInvalid {
            path: self.remote.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace the local manifest with the downloaded remote copy.
    ///
    /// Remove-then-rename; the rename is the commit point. The committed
    /// file is byte-identical to the downloaded document.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Commit`] if either step fails. The remote copy is left in
    /// place in that case.
    pub async fn commit_remote(&self) -> Result<()> {
        if !fs::try_exists(&self.remote).await.unwrap_or(false) {
            return Err(UpdateError::Commit {
                reason: format!("no downloaded manifest at {}", self.remote.display()),
            });
        }

        remove_if_exists(&self.local).await.map_err(|e| UpdateError::Commit {
            reason: format!("removing {}: {e}", self.local.display()),
        })?;

        fs::rename(&self.remote, &self.local).await.map_err(|e| UpdateError::Commit {
            reason: format!(
                "renaming {} to {}: {e}",
                self.remote.display(),
                self.local.display()
            ),
        })?;

        info!(path = %self.local.display(), "Committed new release manifest");
        Ok(())
    }

    /// Write a manifest as the local copy, atomically.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Io`] if serialization or the write fails.
    pub async fn write_local(&self, manifest: &Manifest) -> Result<()> {
        let content = manifest.to_json_pretty().map_err(std::io::Error::other)?;
        atomic_write_async(&self.local, content.into_bytes())
            .await
            .map_err(|e| UpdateError::Io(std::io::Error::other(format!("{e:#}"))))
    }

    /// Delete a leftover remote copy, if any.
    pub async fn discard_remote(&self) -> Result<bool> {
        Ok(remove_if_exists(&self.remote).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(hash: &str) -> Manifest {
        Manifest::new(hash, vec!["https://cdn.example/app.asar.gz".to_string()])
    }

    #[test]
    fn test_parse_schema() {
        let json = r#"{"client":{"hash":"abc","app":{"urls":["u1","u2"]}},"extra":1}"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert_eq!(manifest.hash(), "abc");
        assert_eq!(manifest.bundle_urls(), ["u1".to_string(), "u2".to_string()]);
    }

    #[test]
    fn test_parse_rejects_missing_hash() {
        assert!(Manifest::from_json(r#"{"client":{"app":{"urls":[]}}}"#).is_err());
        assert!(Manifest::from_json("{").is_err());
    }

    #[test]
    fn test_requires_update() {
        let abc = sample("abc");
        let def = sample("def");
        assert!(Manifest::requires_update(None, &abc));
        assert!(!Manifest::requires_update(Some(&abc), &abc));
        assert!(Manifest::requires_update(Some(&abc), &def));
    }

    #[test]
    fn test_remote_path_suffix() {
        let store = ManifestStore::new("/data/abyui-release.json");
        assert_eq!(store.remote_path(), Path::new("/data/abyui-release.json.remote"));
    }

    #[tokio::test]
    async fn test_load_local_absent_or_corrupt() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("release.json"));

        assert!(store.load_local().await.is_none());
        assert!(matches!(store.read_local().await, Err(UpdateError::ManifestRead { .. })));

        std::fs::write(store.local_path(), "{ not json").unwrap();
        assert!(store.load_local().await.is_none());
    }

    #[tokio::test]
    async fn test_write_then_load_local() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("data").join("release.json"));

        store.write_local(&sample("abc")).await.unwrap();
        assert_eq!(store.load_local().await, Some(sample("abc")));
    }

    #[tokio::test]
    async fn test_commit_replaces_local_with_remote_bytes() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("release.json"));
        store.write_local(&sample("abc")).await.unwrap();

        let remote_doc = r#"{"client":{"hash":"def","app":{"urls":[]}},"notes":"x"}"#;
        std::fs::write(store.remote_path(), remote_doc).unwrap();

        store.commit_remote().await.unwrap();
        assert_eq!(std::fs::read_to_string(store.local_path()).unwrap(), remote_doc);
        assert!(!store.remote_path().exists());
    }

    #[tokio::test]
    async fn test_commit_without_local() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("release.json"));
        std::fs::write(store.remote_path(), r#"{"client":{"hash":"def","app":{"urls":[]}}}"#)
            .unwrap();

        store.commit_remote().await.unwrap();
        assert_eq!(store.load_local().await.unwrap().hash(), "def");
    }

    #[tokio::test]
    async fn test_commit_without_remote_fails() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("release.json"));
        store.write_local(&sample("abc")).await.unwrap();

        let err = store.commit_remote().await.unwrap_err();
        assert!(matches!(err, UpdateError::Commit { .. }));
        assert_eq!(store.load_local().await, Some(sample("abc")));
    }

    #[tokio::test]
    async fn test_read_remote_invalid() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("release.json"));
        std::fs::write(store.remote_path(), "<html>rate limited</html>").unwrap();

        assert!(matches!(store.read_remote().await, Err(UpdateError::ManifestInvalid { .. })));
        assert!(store.discard_remote().await.unwrap());
        assert!(!store.discard_remote().await.unwrap());
    }
}
