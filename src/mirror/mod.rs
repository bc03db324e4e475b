//! Mirror selection for downloads.
//!
//! The release manifest is published to several source-control hosts. Each
//! host has different trade-offs, so downloads walk through them in priority
//! tiers as attempts fail:
//!
//! | Attempts (retry count) | Backend | Trade-off |
//! |---|---|---|
//! | 0, 1 | GitLab | stable, not resumable |
//! | 2 | Bitbucket | resumable, access-restricted |
//! | 3, 4 | GitHub | unrestricted, not resumable |
//! | 5+ | none | exhausted |
//!
//! The policy is an ordered [`MirrorTable`] of `(max_retry, backend)` entries
//! scanned linearly, so it can be changed in configuration and tested apart
//! from the download loop.
//!
//! Bundle archives do not use the tiers: their URLs come straight from the
//! manifest and are tried one per retry index via [`ManifestMirrors`].

use crate::core::{Result, UpdateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A source-control host that serves raw files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MirrorBackend {
    /// gitlab.com raw files
    Gitlab,
    /// bitbucket.org raw files
    Bitbucket,
    /// raw.githubusercontent.com
    Github,
}

impl MirrorBackend {
    /// Raw-file URL of `file` in the repository described by `source`.
    pub fn raw_url(self, source: &ReleaseSource, file: &str) -> String {
        let ReleaseSource {
            user,
            repo,
            reference,
        } = source;
        match self {
            Self::Github => {
                format!("https://raw.githubusercontent.com/{user}/{repo}/{reference}/{file}")
            }
            Self::Gitlab => format!("https://gitlab.com/{user}/{repo}/raw/{reference}/{file}"),
            Self::Bitbucket => {
                format!("https://bitbucket.org/{user}/{repo}/raw/{reference}/{file}")
            }
        }
    }

    /// Whether the host honours range requests.
    pub const fn resumable(self) -> bool {
        matches!(self, Self::Bitbucket)
    }
}

impl fmt::Display for MirrorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Gitlab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::Github => "github",
        };
        f.write_str(name)
    }
}

/// Repository coordinates of the release manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSource {
    /// Account owning the release repository
    #[serde(default = "default_user")]
    pub user: String,

    /// Repository name
    #[serde(default = "default_repo")]
    pub repo: String,

    /// Branch, tag or commit to read from
    #[serde(default = "default_reference")]
    pub reference: String,
}

impl Default for ReleaseSource {
    fn default() -> Self {
        Self {
            user: default_user(),
            repo: default_repo(),
            reference: default_reference(),
        }
    }
}

fn default_user() -> String {
    "aby-ui".to_string()
}

fn default_repo() -> String {
    "repo-release".to_string()
}

fn default_reference() -> String {
    "master".to_string()
}

/// One row of the mirror policy: use `backend` while `retry < max_retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorTier {
    /// Exclusive upper bound on the retry count served by this tier
    pub max_retry: u32,
    /// Host serving this tier
    pub backend: MirrorBackend,
}

impl MirrorTier {
    /// Convenience constructor.
    pub const fn new(max_retry: u32, backend: MirrorBackend) -> Self {
        Self {
            max_retry,
            backend,
        }
    }
}

/// Ordered mirror policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTable {
    tiers: Vec<MirrorTier>,
}

impl MirrorTable {
    /// Build a table, validating that bounds strictly increase.
    ///
    /// # Errors
    ///
    /// [`UpdateError::Config`] for an empty table or a bound that does not
    /// exceed the previous one.
    pub fn new(tiers: Vec<MirrorTier>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(UpdateError::Config {
                message: "mirror table must contain at least one tier".to_string(),
            });
        }

        let mut previous = 0;
        for tier in &tiers {
            if tier.max_retry <= previous {
                return Err(UpdateError::Config {
                    message: format!(
                        "mirror tier '{}' has max_retry {} which does not exceed the previous bound {}",
                        tier.backend, tier.max_retry, previous
                    ),
                });
            }
            previous = tier.max_retry;
        }

        Ok(Self {
            tiers,
        })
    }

    /// GitLab for retries 0-1, Bitbucket for 2, GitHub for 3-4.
    pub fn standard() -> Self {
        Self {
            tiers: standard_tiers(),
        }
    }

    /// Backend for a retry count, or `None` once every tier is exhausted.
    pub fn backend_for(&self, retry: u32) -> Option<MirrorBackend> {
        self.tiers.iter().find(|tier| retry < tier.max_retry).map(|tier| tier.backend)
    }

    /// First retry count for which [`backend_for`](Self::backend_for) returns `None`.
    pub fn exhaustion_point(&self) -> u32 {
        self.tiers.last().map_or(0, |tier| tier.max_retry)
    }

    /// The tiers in priority order.
    pub fn tiers(&self) -> &[MirrorTier] {
        &self.tiers
    }
}

impl Default for MirrorTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// The default policy as configuration rows.
pub fn standard_tiers() -> Vec<MirrorTier> {
    vec![
        MirrorTier::new(2, MirrorBackend::Gitlab),
        MirrorTier::new(3, MirrorBackend::Bitbucket),
        MirrorTier::new(5, MirrorBackend::Github),
    ]
}

/// Produces the URL to try for a file on a given retry.
///
/// Returning `None` ends the download with
/// [`UpdateError::ExhaustedMirrors`].
pub trait UrlSelector: Send + Sync {
    /// URL for `file` on attempt `retry` (0-based).
    fn select(&self, file: &str, retry: u32) -> Option<String>;
}

/// Tiered selector over the release repository mirrors.
#[derive(Debug, Clone)]
pub struct MirrorResolver {
    table: MirrorTable,
    source: ReleaseSource,
}

impl MirrorResolver {
    /// Resolver for `source` following `table`.
    pub fn new(table: MirrorTable, source: ReleaseSource) -> Self {
        Self {
            table,
            source,
        }
    }

    /// Backend chosen for a retry count.
    pub fn resolve_backend(&self, retry: u32) -> Option<MirrorBackend> {
        self.table.backend_for(retry)
    }

    /// URL of `file` for a retry count, or `None` once exhausted.
    pub fn resolve(&self, file: &str, retry: u32) -> Option<String> {
        self.resolve_backend(retry).map(|backend| backend.raw_url(&self.source, file))
    }

    /// The release source this resolver points at.
    pub fn source(&self) -> &ReleaseSource {
        &self.source
    }

    /// The policy table.
    pub fn table(&self) -> &MirrorTable {
        &self.table
    }
}

impl UrlSelector for MirrorResolver {
    fn select(&self, file: &str, retry: u32) -> Option<String> {
        self.resolve(file, retry)
    }
}

/// Selector over a manifest's own ordered CDN list: entry `retry`, no fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestMirrors {
    urls: Vec<String>,
}

impl ManifestMirrors {
    /// Wrap the ordered URL list.
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
        }
    }
}

impl UrlSelector for ManifestMirrors {
    fn select(&self, _file: &str, retry: u32) -> Option<String> {
        self.urls.get(retry as usize).cloned()
    }
}
