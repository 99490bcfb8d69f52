//! Lockgraph Core Library
//!
//! Reads, models and writes locked dependency graphs in the
//! `Gemfile.lock` text format.

pub mod catalog;
pub mod config;
pub mod lockfile;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::LockConfig;

    // Lockfile
    pub use crate::lockfile::{
        Dependency, Diagnostic, Diagnostics, LockedGraph, LockedPackage, LockfileError,
        LockfileStore, PackageOrigin, PseudoEntries, parse_lockfile, serialize_lockfile,
    };

    // Catalogs
    pub use crate::catalog::{CatalogFactory, CatalogId, RegistryCatalog, WorkPool};
}
