//! Lockfile store for loading and saving lockfiles on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use super::diagnostics::Diagnostics;
use super::reader::{load_lockfile, parse_lockfile};
use super::types::LockedGraph;
use super::writer::serialize_lockfile_with;
use crate::catalog::{CatalogFactory, WorkPool};
use crate::config::LockConfig;

/// A lockfile read from disk together with its non-fatal findings.
#[derive(Debug)]
pub struct LoadedLockfile {
    pub graph: LockedGraph,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct LockfileStore {
    path: PathBuf,
}

impl LockfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the raw lockfile text. A missing file reads as empty.
    pub fn read_text(&self) -> anyhow::Result<String> {
        if !self.path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read lockfile: {}", self.path.display()))
    }

    /// Parse the lockfile without constructing catalog handles.
    pub fn load(&self) -> anyhow::Result<LoadedLockfile> {
        let content = self.read_text()?;
        let mut diagnostics = Diagnostics::new();
        let graph = parse_lockfile(&content, &mut diagnostics)
            .with_context(|| format!("Failed to parse lockfile: {}", self.path.display()))?;
        Ok(LoadedLockfile { graph, diagnostics })
    }

    /// Parse the lockfile and construct registry catalog handles on a pool
    /// sized by `config.catalog_workers`.
    pub fn load_with_catalogs(
        &self,
        config: &LockConfig,
        factory: Arc<dyn CatalogFactory>,
    ) -> anyhow::Result<LoadedLockfile> {
        let content = self.read_text()?;

        // Block on async catalog construction using tokio runtime
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;
        let pool = WorkPool::new(
            "lockgraph-catalog",
            config.catalog_workers,
            runtime.handle().clone(),
        );

        let mut diagnostics = Diagnostics::new();
        let graph = runtime
            .block_on(load_lockfile(&content, &mut diagnostics, factory, &pool))
            .with_context(|| format!("Failed to parse lockfile: {}", self.path.display()))?;
        Ok(LoadedLockfile { graph, diagnostics })
    }

    /// Write `graph` in canonical form.
    pub fn save(&self, graph: &LockedGraph, config: &LockConfig) -> anyhow::Result<()> {
        let content = serialize_lockfile_with(graph, &config.pseudo_entries());
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create lockfile directory: {}", parent.display())
                })?;
            }
        }
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write lockfile: {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "wrote lockfile");
        Ok(())
    }
}
