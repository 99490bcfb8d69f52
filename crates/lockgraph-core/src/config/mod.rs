//! Configuration for reading and writing lockfiles.
//!
//! Loaded from `lockgraph.toml` in the user config directory, or from an
//! explicit path.

pub mod parser;
pub mod paths;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::DEFAULT_CATALOG_WORKERS;
use crate::lockfile::PseudoEntries;

/// Lockgraph configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Maximum number of catalog handles constructed at once
    pub catalog_workers: usize,

    /// Package names never listed under `specs:`
    pub pseudo_entries: Vec<String>,

    /// Directory for catalog caches (defaults to the user cache directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl LockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields the
    /// default configuration.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => parser::parse_config(path),
            None => {
                let path = paths::default_config_path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                parser::parse_config(&path)
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.catalog_workers == 0 {
            anyhow::bail!("catalog_workers must be at least 1");
        }
        if let Some(name) = self
            .pseudo_entries
            .iter()
            .find(|name| name.trim().is_empty() || name.contains(char::is_whitespace))
        {
            anyhow::bail!("Invalid pseudo entry name: {:?}", name);
        }
        Ok(())
    }

    pub fn pseudo_entries(&self) -> PseudoEntries {
        PseudoEntries::new(self.pseudo_entries.iter().cloned())
    }

    /// Configured state directory, falling back to the user cache directory
    pub fn state_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::default_state_dir(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            catalog_workers: DEFAULT_CATALOG_WORKERS,
            pseudo_entries: PseudoEntries::default().names().to_vec(),
            state_dir: None,
        }
    }
}
