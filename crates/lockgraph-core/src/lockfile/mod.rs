//! Lockfile model, reader and writer.
//!
//! Represents a fully resolved dependency graph and its canonical text form.

pub mod diagnostics;
pub mod error;
pub mod origin;
pub mod reader;
pub mod sections;
pub mod store;
pub mod types;
pub mod writer;

pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::LockfileError;
pub use origin::{GitReference, GitSource, PackageOrigin, PathSource, RefKind};
pub use reader::{load_lockfile, parse_lockfile};
pub use store::{LoadedLockfile, LockfileStore};
pub use types::{CatalogSlot, Dependency, GraphId, LockedGraph, LockedPackage};
pub use writer::{PseudoEntries, serialize_lockfile, serialize_lockfile_with};
