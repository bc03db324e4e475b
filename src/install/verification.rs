use crate::core::{Result, UpdateError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// What to do with the manifest hash once a bundle has been decompressed.
///
/// Release manifests identify a release by `client.hash`, but nothing
/// guarantees that value is a digest of the bundle. Checking is therefore opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityPolicy {
    /// Do not hash the bundle.
    #[default]
    Skip,
    /// Hash the bundle and log a mismatch, but still commit.
    Warn,
    /// Hash the bundle and refuse to commit on mismatch.
    Enforce,
}

/// Result of a verification pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Policy was [`IntegrityPolicy::Skip`].
    Skipped,
    /// The bundle hashes to the expected value.
    Matched,
    /// The bundle does not match; only returned under [`IntegrityPolicy::Warn`].
    Mismatched {
        /// Normalized expected digest
        expected: String,
        /// Normalized actual digest
        actual: String,
    },
}

/// SHA-256 helpers for staged bundles.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Lowercase hex SHA-256 of a file, streamed from disk.
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!(path = %file_path.display(), "Computing SHA-256");

        let path = file_path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let file = File::open(&path).map_err(|e| UpdateError::stream("hashing", &path, e))?;
            let mut hasher = Sha256::new();
            std::io::copy(&mut BufReader::new(file), &mut hasher)
                .map_err(|e| UpdateError::stream("hashing", &path, e))?;
            Ok(hex::encode(hasher.finalize()))
        })
        .await
        .map_err(|e| UpdateError::Io(std::io::Error::other(e)))?
    }

    /// Strip an optional `sha256:` prefix and lowercase the digest.
    pub fn normalize(hash: &str) -> String {
        let hash = hash.trim();
        let hash = hash.strip_prefix("sha256:").unwrap_or(hash);
        hash.to_lowercase()
    }

    /// Check `file_path` against `expected` under `policy`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Integrity`] on mismatch under [`IntegrityPolicy::Enforce`],
    /// [`UpdateError::Stream`] if the file cannot be hashed.
    pub async fn verify(
        file_path: &Path,
        expected: &str,
        policy: IntegrityPolicy,
    ) -> Result<Verification> {
        if policy == IntegrityPolicy::Skip {
            return Ok(Verification::Skipped);
        }

        let expected = Self::normalize(expected);
        let actual = Self::compute_sha256(file_path).await?;

        if actual == expected {
            info!(path = %file_path.display(), "Bundle checksum verified");
            return Ok(Verification::Matched);
        }

        match policy {
            IntegrityPolicy::Enforce => Err(UpdateError::Integrity {
                expected,
                actual,
            }),
            _ => {
                warn!(
                    path = %file_path.display(),
                    %expected,
                    %actual,
                    "Bundle checksum does not match manifest hash"
                );
                Ok(Verification::Mismatched {
                    expected,
                    actual,
                })
            }
        }
    }
}
