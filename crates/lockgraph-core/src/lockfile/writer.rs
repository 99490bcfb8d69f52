//! Canonical lockfile serialization.
//!
//! Output order:
//! 1. `GIT` blocks, one per (remote, revision), sorted
//! 2. `PATH` blocks, one per location, sorted
//! 3. one `GEM` block for every listed registry-origin package, if any
//! 4. `PLATFORMS`, `DEPENDENCIES`, `RUBY VERSION`, `BUNDLED WITH`
//!
//! Within a block, entries are sorted by name then platform (unqualified
//! first), and each entry's dependencies by name.

use std::collections::{BTreeMap, HashSet};

use super::origin::PackageOrigin;
use super::types::{LockedGraph, LockedPackage, base_name};
use crate::catalog::CatalogId;

/// Package names that are kept in the graph but never listed under `specs:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoEntries {
    names: Vec<String>,
}

impl PseudoEntries {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for PseudoEntries {
    /// The packaging tool itself and the host runtime.
    fn default() -> Self {
        Self::new(["bundler", "ruby"])
    }
}

/// Serialize `graph` with the default pseudo-entry names.
pub fn serialize_lockfile(graph: &LockedGraph) -> String {
    serialize_lockfile_with(graph, &PseudoEntries::default())
}

/// Serialize `graph`, omitting `pseudo` names from every `specs:` listing.
pub fn serialize_lockfile_with(graph: &LockedGraph, pseudo: &PseudoEntries) -> String {
    let mut entries: Vec<&LockedPackage> = graph.iter_packages().collect();
    entries.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| a.platform().cmp(&b.platform()))
    });

    // Pseudo-entries never form or join a group
    let mut groups: BTreeMap<CatalogId, Vec<&LockedPackage>> = BTreeMap::new();
    for package in entries {
        if pseudo.contains(package.name()) {
            continue;
        }
        groups
            .entry(CatalogId::for_origin(package.origin()))
            .or_default()
            .push(package);
    }
    let registry = groups.remove(&CatalogId::Registry).unwrap_or_default();

    let mut out = LockWriter::new();

    for packages in groups.values() {
        let origin = packages[0].origin();
        out.line(origin.section_label());
        match origin {
            PackageOrigin::Git(git) => {
                out.line(format!("  remote: {}", git.remote));
                out.line(format!("  revision: {}", git.revision));
                if let Some(reference) = &git.reference {
                    out.line(format!("  {}: {}", reference.kind, reference.value));
                }
            }
            PackageOrigin::Path(path) => {
                out.line(format!("  remote: {}", path.location));
            }
            PackageOrigin::Registry => {}
        }
        out.specs(packages);
        out.end_block();
    }

    if !registry.is_empty() {
        out.line(PackageOrigin::Registry.section_label());
        for remote in &graph.registry_remotes {
            out.line(format!("  remote: {}", remote));
        }
        out.specs(&registry);
        out.end_block();
    }

    if !graph.platforms.is_empty() {
        out.line("PLATFORMS");
        for platform in &graph.platforms {
            out.line(format!("  {}", platform));
        }
        out.end_block();
    }

    // `!` marks top-level dependencies not listed in the registry group
    let registry_names: HashSet<&str> = registry.iter().map(|p| p.name()).collect();
    out.line("DEPENDENCIES");
    for dependency in &graph.dependencies {
        let bang = if registry_names.contains(base_name(dependency)) {
            ""
        } else {
            "!"
        };
        out.line(format!("  {}{}", dependency, bang));
    }
    out.end_block();

    if let Some(ruby_version) = &graph.ruby_version {
        out.line("RUBY VERSION");
        out.line(format!("   {}", ruby_version));
        out.end_block();
    }

    if let Some(bundler_version) = &graph.bundler_version {
        out.line("BUNDLED WITH");
        out.line(format!("   {}", bundler_version));
        out.end_block();
    }

    out.finish()
}

struct LockWriter {
    lines: Vec<String>,
}

impl LockWriter {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn end_block(&mut self) {
        self.lines.push(String::new());
    }

    fn specs(&mut self, packages: &[&LockedPackage]) {
        self.line("  specs:");
        for package in packages {
            self.line(format!("    {} ({})", package.name(), package.full_version()));

            let mut dependencies: Vec<_> = package.dependencies().iter().collect();
            dependencies.sort_by(|a, b| a.name.cmp(&b.name));
            for dependency in dependencies {
                self.line(format!("      {}", dependency));
            }
        }
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}
