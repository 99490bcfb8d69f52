//! Catalog identities and registry catalog handles.
//!
//! Git and path packages resolve to a catalog derived from their own
//! origin fields. Registry packages share one aggregate catalog group made
//! of every registry remote in the graph; the handles for those remotes are
//! constructed on a bounded [`WorkPool`] after parsing.

pub mod pool;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::lockfile::{CatalogSlot, PackageOrigin};

pub use pool::{DEFAULT_CATALOG_WORKERS, WorkPool};

/// Identity of the catalog authoritative for a package.
///
/// Ordering puts git catalogs before path catalogs, git sorted by
/// (remote, revision) and path by location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CatalogId {
    /// Aggregate group spanning every registry remote
    Registry,
    Git { remote: String, revision: String },
    Path { location: String },
}

impl CatalogId {
    pub fn for_origin(origin: &PackageOrigin) -> Self {
        match origin {
            PackageOrigin::Registry => Self::Registry,
            PackageOrigin::Git(git) => Self::Git {
                remote: git.remote.clone(),
                revision: git.revision.clone(),
            },
            PackageOrigin::Path(path) => Self::Path {
                location: path.location.clone(),
            },
        }
    }
}

/// Failure to construct the catalog handle for one registry remote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to construct catalog for {remote}: {message}")]
pub struct CatalogError {
    pub remote: String,
    pub message: String,
}

impl CatalogError {
    pub fn new(remote: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            message: message.into(),
        }
    }
}

/// Handle to a registry catalog.
///
/// Holds only the location; package metadata is fetched by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCatalog {
    location: Url,
}

impl RegistryCatalog {
    pub fn new(location: Url) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Stable key for caching catalog data locally.
    pub fn cache_key(&self) -> String {
        blake3::hash(self.location.as_str().as_bytes())
            .to_hex()
            .to_string()
    }

    /// Cache directory for this catalog under `state_dir`.
    pub fn cache_dir(&self, state_dir: &Path) -> PathBuf {
        state_dir.join("catalogs").join(self.cache_key())
    }
}

/// Builds catalog handles for registry remotes.
pub trait CatalogFactory: Send + Sync {
    fn make_catalog(&self, location: &str) -> Result<RegistryCatalog, CatalogError>;
}

/// Default factory: accepts `http`, `https` and `file` URLs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlCatalogFactory;

impl CatalogFactory for UrlCatalogFactory {
    fn make_catalog(&self, location: &str) -> Result<RegistryCatalog, CatalogError> {
        let url = Url::parse(location).map_err(|e| CatalogError::new(location, e.to_string()))?;
        match url.scheme() {
            "http" | "https" | "file" => Ok(RegistryCatalog::new(url)),
            other => Err(CatalogError::new(
                location,
                format!("unsupported scheme: {}", other),
            )),
        }
    }
}

/// Construct one catalog handle per remote on `pool`.
///
/// Results are returned in the order of `remotes`. A failure is attributed
/// to its own remote and does not affect the others.
pub async fn build_catalogs<I>(
    remotes: I,
    factory: Arc<dyn CatalogFactory>,
    pool: &WorkPool,
) -> Vec<(String, CatalogSlot)>
where
    I: IntoIterator<Item = String>,
{
    let mut pending = Vec::new();
    for remote in remotes {
        let factory = Arc::clone(&factory);
        let location = remote.clone();
        let handle = pool
            .spawn_blocking(move || factory.make_catalog(&location))
            .await;
        pending.push((remote, handle));
    }

    let mut catalogs = Vec::with_capacity(pending.len());
    for (remote, handle) in pending {
        let slot = match handle {
            Ok(handle) => match handle.await {
                Ok(result) => result.map(Arc::new),
                Err(e) => Err(CatalogError::new(
                    remote.as_str(),
                    format!("catalog worker failed: {}", e),
                )),
            },
            Err(e) => Err(CatalogError::new(remote.as_str(), e.to_string())),
        };
        if let Err(e) = &slot {
            tracing::warn!("{}", e);
        }
        catalogs.push((remote, slot));
    }

    tracing::debug!(
        pool = pool.name(),
        count = catalogs.len(),
        "constructed registry catalogs"
    );
    catalogs
}
