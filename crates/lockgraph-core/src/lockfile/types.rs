//! Locked dependency graph types.
//!
//! A [`LockedGraph`] is the in-memory form of a lockfile: every resolved
//! package with its origin, the registry remotes, platforms, top-level
//! dependencies and tool metadata.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::LockfileError;
use super::origin::PackageOrigin;
use crate::catalog::{CatalogError, CatalogId, RegistryCatalog};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle identifying the graph a package was added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        Self(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Result of constructing the catalog handle for one registry remote.
pub type CatalogSlot = Result<Arc<RegistryCatalog>, CatalogError>;

/// Fully resolved dependency graph
///
/// Cloning yields a graph with a fresh [`GraphId`]; the copied packages are
/// re-stamped with it.
#[derive(Debug, Serialize)]
pub struct LockedGraph {
    #[serde(skip)]
    id: GraphId,

    /// Locked packages by name. Several entries share a name only when
    /// their platforms differ.
    packages: BTreeMap<String, Vec<LockedPackage>>,

    /// Registry locations referenced by registry-origin packages
    pub registry_remotes: BTreeSet<String>,

    /// Platforms the graph was resolved for, in lockfile order
    pub platforms: Vec<String>,

    /// Top-level requirements, in lockfile order, without `!` markers
    pub dependencies: Vec<String>,

    /// Runtime version constraint (`RUBY VERSION`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruby_version: Option<String>,

    /// Version of the tool that wrote the lockfile (`BUNDLED WITH`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundler_version: Option<String>,

    #[serde(skip)]
    server_catalogs: Vec<(String, CatalogSlot)>,
}

impl LockedGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            id: GraphId::next(),
            packages: BTreeMap::new(),
            registry_remotes: BTreeSet::new(),
            platforms: Vec::new(),
            dependencies: Vec::new(),
            ruby_version: None,
            bundler_version: None,
            server_catalogs: Vec::new(),
        }
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Add a locked package, stamping it with this graph's id.
    ///
    /// Fails if the name cannot be written as a `specs:` entry, if an entry
    /// with the same name and platform already exists, or if an entry with
    /// another platform renders the same `name (version-platform)` text.
    pub fn add_package(
        &mut self,
        mut package: LockedPackage,
    ) -> Result<&LockedPackage, LockfileError> {
        if !is_package_name(&package.name) {
            return Err(LockfileError::InvalidName { name: package.name });
        }

        let entries = self.packages.entry(package.name.clone()).or_default();
        if entries.iter().any(|p| p.platform == package.platform) {
            return Err(LockfileError::DuplicatePackage {
                name: package.name,
                platform: package.platform,
            });
        }
        let rendered = package.full_version();
        if entries.iter().any(|p| p.full_version() == rendered) {
            return Err(LockfileError::AmbiguousEntry {
                name: package.name,
                rendered,
            });
        }

        package.graph = Some(self.id);
        entries.push(package);
        Ok(&entries[entries.len() - 1])
    }

    /// Locked packages keyed by name
    pub fn packages(&self) -> &BTreeMap<String, Vec<LockedPackage>> {
        &self.packages
    }

    /// All entries locked under `name`
    pub fn packages_named(&self, name: &str) -> &[LockedPackage] {
        self.packages.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Get the entry for `name` with the given platform qualifier
    pub fn get_package(&self, name: &str, platform: Option<&str>) -> Option<&LockedPackage> {
        self.packages_named(name)
            .iter()
            .find(|p| p.platform.as_deref() == platform)
    }

    /// Every locked package, ordered by name then insertion
    pub fn iter_packages(&self) -> impl Iterator<Item = &LockedPackage> {
        self.packages.values().flatten()
    }

    pub fn package_count(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    /// Base names of the top-level dependencies (text before the first space)
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(|dep| base_name(dep))
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
            && self.registry_remotes.is_empty()
            && self.platforms.is_empty()
            && self.dependencies.is_empty()
            && self.ruby_version.is_none()
            && self.bundler_version.is_none()
    }

    /// Check whether `package` was added to this graph
    pub fn owns(&self, package: &LockedPackage) -> bool {
        package.graph == Some(self.id)
    }

    /// Catalog identity that is authoritative for `package`.
    ///
    /// Registry-origin packages all map to the aggregate registry group,
    /// which spans every location in `registry_remotes`. Returns `None`
    /// for packages that belong to another graph.
    pub fn catalog_for(&self, package: &LockedPackage) -> Option<CatalogId> {
        if !self.owns(package) {
            return None;
        }
        Some(CatalogId::for_origin(&package.origin))
    }

    /// Catalog handles constructed for the registry remotes, one per remote
    pub fn server_catalogs(&self) -> &[(String, CatalogSlot)] {
        &self.server_catalogs
    }

    /// Catalog handle constructed for one registry remote
    pub fn server_catalog(&self, location: &str) -> Option<&CatalogSlot> {
        self.server_catalogs
            .iter()
            .find(|(remote, _)| remote == location)
            .map(|(_, slot)| slot)
    }

    pub(crate) fn set_server_catalogs(&mut self, catalogs: Vec<(String, CatalogSlot)>) {
        self.server_catalogs = catalogs;
    }

    /// Render this graph as canonical lockfile text
    pub fn dump(&self) -> String {
        super::writer::serialize_lockfile(self)
    }
}

impl Default for LockedGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LockedGraph {
    fn clone(&self) -> Self {
        let id = GraphId::next();
        let packages = self
            .packages
            .iter()
            .map(|(name, entries)| {
                let entries = entries
                    .iter()
                    .map(|package| LockedPackage {
                        graph: Some(id),
                        ..package.clone()
                    })
                    .collect();
                (name.clone(), entries)
            })
            .collect();

        Self {
            id,
            packages,
            registry_remotes: self.registry_remotes.clone(),
            platforms: self.platforms.clone(),
            dependencies: self.dependencies.clone(),
            ruby_version: self.ruby_version.clone(),
            bundler_version: self.bundler_version.clone(),
            server_catalogs: self.server_catalogs.clone(),
        }
    }
}

impl PartialEq for LockedGraph {
    fn eq(&self, other: &Self) -> bool {
        self.packages == other.packages
            && self.registry_remotes == other.registry_remotes
            && self.platforms == other.platforms
            && self.dependencies == other.dependencies
            && self.ruby_version == other.ruby_version
            && self.bundler_version == other.bundler_version
    }
}

impl Eq for LockedGraph {}

/// A single resolved package
///
/// Fields are fixed once the package is built; the only change made on
/// insertion is recording which graph it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct LockedPackage {
    name: String,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<String>,
    origin: PackageOrigin,
    dependencies: Vec<Dependency>,
    #[serde(skip)]
    graph: Option<GraphId>,
}

impl LockedPackage {
    /// Create a new locked package with no platform and no dependencies
    pub fn new(name: impl Into<String>, version: impl Into<String>, origin: PackageOrigin) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            platform: None,
            origin,
            dependencies: Vec::new(),
            graph: None,
        }
    }

    /// Set the platform qualifier
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Append a dependency
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = Dependency>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn origin(&self) -> &PackageOrigin {
        &self.origin
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Graph this package was added to, if any
    pub fn graph_id(&self) -> Option<GraphId> {
        self.graph
    }

    /// Version with the platform suffix, as written in `specs:` entries
    pub fn full_version(&self) -> String {
        match &self.platform {
            Some(platform) => format!("{}-{}", self.version, platform),
            None => self.version.clone(),
        }
    }
}

impl PartialEq for LockedPackage {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.platform == other.platform
            && self.origin == other.origin
            && self.dependencies == other.dependencies
    }
}

impl Eq for LockedPackage {}

/// A dependency edge of a locked package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    /// Requirement strings in written order (may be empty)
    pub constraints: Vec<String>,
}

impl Dependency {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraints.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.constraints.join(", "))
        }
    }
}

/// Text before the first space of a requirement string
pub(crate) fn base_name(requirement: &str) -> &str {
    requirement.split(' ').next().unwrap_or(requirement)
}

/// Non-empty, with no whitespace or parentheses
pub(crate) fn is_package_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(|c: char| c.is_whitespace() || c == '(' || c == ')')
}
