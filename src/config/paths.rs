//! On-disk layout of the update artifacts.

use crate::constants::{
    BUNDLE_ARCHIVE_FILE, DEFAULT_MANIFEST_FILE, REMOTE_MANIFEST_SUFFIX, STAGED_BUNDLE_FILE,
};
use crate::utils::with_suffix;
use std::path::{Path, PathBuf};

/// Every path the update pipeline reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePaths {
    data_dir: PathBuf,
    resources_dir: PathBuf,
    manifest_file: String,
}

impl UpdatePaths {
    /// Layout with the manifest in `data_dir` and bundles in `resources_dir`.
    pub fn new(data_dir: &Path, resources_dir: &Path, manifest_file: &str) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            resources_dir: resources_dir.to_path_buf(),
            manifest_file: manifest_file.to_string(),
        }
    }

    /// Layout rooted at `root`: `root/data` and `root/resources`, default manifest name.
    pub fn under(root: &Path) -> Self {
        Self::new(
            &root.join(crate::constants::DATA_DIR_NAME),
            &root.join(crate::constants::RESOURCES_DIR_NAME),
            DEFAULT_MANIFEST_FILE,
        )
    }

    /// Directory holding manifests and locks.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding bundles.
    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    /// Manifest file name, both on disk and on the release host.
    pub fn manifest_file(&self) -> &str {
        &self.manifest_file
    }

    /// The last committed manifest.
    pub fn local_manifest(&self) -> PathBuf {
        self.data_dir.join(&self.manifest_file)
    }

    /// Download target for the manifest fetched this cycle.
    pub fn remote_manifest(&self) -> PathBuf {
        with_suffix(&self.local_manifest(), REMOTE_MANIFEST_SUFFIX)
    }

    /// Download target for the compressed bundle.
    pub fn bundle_archive(&self) -> PathBuf {
        self.resources_dir.join(BUNDLE_ARCHIVE_FILE)
    }

    /// Decompressed bundle awaiting a restart.
    pub fn staged_bundle(&self) -> PathBuf {
        self.resources_dir.join(STAGED_BUNDLE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_root() {
        let paths = UpdatePaths::under(Path::new("/opt/app"));
        assert_eq!(paths.local_manifest(), Path::new("/opt/app/data/abyui-release.json"));
        assert_eq!(paths.remote_manifest(), Path::new("/opt/app/data/abyui-release.json.remote"));
        assert_eq!(paths.bundle_archive(), Path::new("/opt/app/resources/app.asar.gz"));
        assert_eq!(paths.staged_bundle(), Path::new("/opt/app/resources/app-updated.asar"));
    }
}
