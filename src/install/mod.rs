//! Bundle installation.
//!
//! A downloaded archive is gzip-decompressed into the staged bundle path, a
//! file distinct from the bundle the application is currently running from.
//! The running installation is never touched; the new bundle becomes active
//! on the next launch.
//!
//! Decompression streams into `<staged>.part`. Only after every byte has been
//! decoded, written, synced and checked against the [`IntegrityPolicy`] is the
//! part file renamed to the staged path, so a staged bundle on disk is always
//! complete and never one the policy rejected. Errors on either side of the
//! stream abort the install with [`UpdateError::Stream`] and remove the part
//! file; the manifest is not committed and the next cycle starts over.
//!
//! Committing the manifest is the caller's final step (see
//! [`crate::manifest::ManifestStore::commit_remote`]).

mod verification;

pub use verification::{ChecksumVerifier, IntegrityPolicy, Verification};

use crate::constants::PARTIAL_DOWNLOAD_SUFFIX;
use crate::core::{Result, UpdateError};
use crate::utils::with_suffix;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Where the bundle was staged
    pub destination: PathBuf,
    /// Decompressed size in bytes
    pub bytes_written: u64,
    /// Integrity check of the decoded bundle, made before it was staged
    pub verification: Verification,
}

/// Decompresses bundle archives into the staged bundle path.
#[derive(Debug, Clone, Default)]
pub struct BundleInstaller {
    policy: IntegrityPolicy,
}

impl BundleInstaller {
    /// Installer checking decoded bundles under `policy`.
    pub const fn new(policy: IntegrityPolicy) -> Self {
        Self {
            policy,
        }
    }

    /// The configured integrity policy.
    pub const fn policy(&self) -> IntegrityPolicy {
        self.policy
    }

    /// Decompress `archive` into `destination`, checking it against `expected_hash`.
    ///
    /// The decoded part file is verified before it is renamed, so a bundle the
    /// policy rejects never reaches `destination`.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Stream`] when the archive cannot be read or decoded, or
    ///   the destination cannot be written
    /// - [`UpdateError::Integrity`] on a mismatch under [`IntegrityPolicy::Enforce`]
    ///
    /// On error `destination` is left untouched.
    pub async fn install(
        &self,
        archive: &Path,
        destination: &Path,
        expected_hash: &str,
    ) -> Result<InstallReport> {
        info!(
            archive = %archive.display(),
            destination = %destination.display(),
            "Installing bundle"
        );

        let part = with_suffix(destination, PARTIAL_DOWNLOAD_SUFFIX);
        let source = archive.to_path_buf();
        let target = part.clone();
        let decoded = tokio::task::spawn_blocking(move || decode_into(&source, &target))
            .await
            .map_err(|e| UpdateError::Io(std::io::Error::other(e)));

        let staged = match decoded {
            Ok(Ok(bytes_written)) => {
                self.stage(&part, destination, expected_hash, bytes_written).await
            }
            Ok(Err(e)) | Err(e) => Err(e),
        };
        if staged.is_err() {
            let _ = tokio::fs::remove_file(&part).await;
        }
        staged
    }

    async fn stage(
        &self,
        part: &Path,
        destination: &Path,
        expected_hash: &str,
        bytes_written: u64,
    ) -> Result<InstallReport> {
        debug!(bytes = bytes_written, "Bundle decompressed");
        let verification = ChecksumVerifier::verify(part, expected_hash, self.policy).await?;

        tokio::fs::rename(part, destination)
            .await
            .map_err(|e| UpdateError::stream("finalizing", destination, e))?;

        Ok(InstallReport {
            destination: destination.to_path_buf(),
            bytes_written,
            verification,
        })
    }
}

fn decode_into(source: &Path, part: &Path) -> Result<u64> {
    let input = File::open(source).map_err(|e| UpdateError::stream("opening", source, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(input));

    if let Some(parent) = part.parent() {
        std::fs::create_dir_all(parent).map_err(|e| UpdateError::stream("creating", parent, e))?;
    }
    let output = File::create(part).map_err(|e| UpdateError::stream("creating", part, e))?;
    let mut writer = BufWriter::new(output);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut written: u64 = 0;
    loop {
        let read = decoder
            .read(&mut buffer)
            .map_err(|e| UpdateError::stream("decompressing", source, e))?;
        if read == 0 {
            break;
        }
        writer
            .write_all(&buffer[..read])
            .map_err(|e| UpdateError::stream("writing", part, e))?;
        written += read as u64;
    }

    let file = writer.into_inner().map_err(|e| UpdateError::stream("writing", part, e.error()))?;
    file.sync_all().map_err(|e| UpdateError::stream("syncing", part, e))?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::gzip;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

    #[tokio::test]
    async fn test_install_decompresses() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.asar.gz");
        let destination = temp.path().join("resources").join("app-updated.asar");
        std::fs::write(&archive, gzip(b"bundle contents")).unwrap();

        let report = BundleInstaller::default().install(&archive, &destination, "abc").await.unwrap();

        assert_eq!(report.bytes_written, 15);
        assert_eq!(std::fs::read(&destination).unwrap(), b"bundle contents");
        assert!(!with_suffix(&destination, "part").exists());
    }

    #[tokio::test]
    async fn test_install_overwrites_previous_stage() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.asar.gz");
        let destination = temp.path().join("app-updated.asar");
        std::fs::write(&destination, b"old").unwrap();
        std::fs::write(&archive, gzip(b"new")).unwrap();

        BundleInstaller::default().install(&archive, &destination, "abc").await.unwrap();
        assert_eq!(std::fs::read(&destination).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_install_corrupt_archive_is_stream_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.asar.gz");
        let destination = temp.path().join("app-updated.asar");
        std::fs::write(&archive, b"definitely not gzip").unwrap();

        let err = BundleInstaller::default().install(&archive, &destination, "abc").await.unwrap_err();

        assert!(matches!(err, UpdateError::Stream { .. }));
        assert!(!destination.exists());
        assert!(!with_suffix(&destination, "part").exists());
    }

    #[tokio::test]
    async fn test_install_truncated_archive_is_stream_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.asar.gz");
        let destination = temp.path().join("app-updated.asar");
        let mut compressed = gzip(&vec![7u8; 100_000]);
        compressed.truncate(compressed.len() / 2);
        std::fs::write(&archive, compressed).unwrap();

        let err = BundleInstaller::default().install(&archive, &destination, "abc").await.unwrap_err();
        assert!(matches!(err, UpdateError::Stream { .. }));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_install_missing_archive() {
        let temp = TempDir::new().unwrap();
        let err = BundleInstaller::default()
            .install(&temp.path().join("absent.gz"), &temp.path().join("out"), "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Stream { ref operation, .. } if operation == "opening"));
    }

    #[tokio::test]
    async fn test_enforced_mismatch_never_reaches_destination() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.asar.gz");
        let destination = temp.path().join("app-updated.asar");
        std::fs::write(&archive, gzip(b"tampered bundle")).unwrap();

        let installer = BundleInstaller::new(IntegrityPolicy::Enforce);
        assert_eq!(installer.policy(), IntegrityPolicy::Enforce);
        let err = installer.install(&archive, &destination, "abc").await.unwrap_err();

        assert!(matches!(err, UpdateError::Integrity { .. }));
        assert!(!destination.exists());
        assert!(!with_suffix(&destination, "part").exists());
    }

    #[tokio::test]
    async fn test_enforced_mismatch_keeps_previous_stage() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.asar.gz");
        let destination = temp.path().join("app-updated.asar");
        std::fs::write(&destination, b"earlier good bundle").unwrap();
        std::fs::write(&archive, gzip(b"tampered bundle")).unwrap();

        let installer = BundleInstaller::new(IntegrityPolicy::Enforce);
        assert!(installer.install(&archive, &destination, "abc").await.is_err());
        assert_eq!(std::fs::read(&destination).unwrap(), b"earlier good bundle");
    }

    #[tokio::test]
    async fn test_verification_outcome_per_policy() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("app.asar.gz");
        let destination = temp.path().join("app-updated.asar");
        std::fs::write(&archive, gzip(b"Hello, World!")).unwrap();

        let report = BundleInstaller::new(IntegrityPolicy::Enforce)
            .install(&archive, &destination, HELLO_SHA256)
            .await
            .unwrap();
        assert_eq!(report.verification, Verification::Matched);

        let report = BundleInstaller::new(IntegrityPolicy::Warn)
            .install(&archive, &destination, "abc")
            .await
            .unwrap();
        assert!(matches!(report.verification, Verification::Mismatched { .. }));
        assert_eq!(std::fs::read(&destination).unwrap(), b"Hello, World!");

        let report = BundleInstaller::default().install(&archive, &destination, "abc").await.unwrap();
        assert_eq!(report.verification, Verification::Skipped);
    }
}
