//! Package origin types.
//!
//! Each locked package records where its content comes from: the shared
//! registry group, a git checkout pinned to a revision, or a local path.

use serde::Serialize;
use std::fmt;

/// Where a locked package is obtained from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PackageOrigin {
    /// Registry source (one of the graph's registry remotes)
    Registry,
    /// Version-control checkout
    Git(GitSource),
    /// Local filesystem path
    Path(PathSource),
}

impl PackageOrigin {
    /// Create a git origin pinned to `revision`.
    pub fn git(remote: impl Into<String>, revision: impl Into<String>) -> Self {
        Self::Git(GitSource::new(remote, revision))
    }

    /// Create a path origin.
    pub fn path(location: impl Into<String>) -> Self {
        Self::Path(PathSource::new(location))
    }

    pub fn is_registry(&self) -> bool {
        matches!(self, Self::Registry)
    }

    pub fn is_git(&self) -> bool {
        matches!(self, Self::Git(_))
    }

    pub fn is_path(&self) -> bool {
        matches!(self, Self::Path(_))
    }

    /// Get the git source if this is a git origin.
    pub fn as_git(&self) -> Option<&GitSource> {
        match self {
            Self::Git(source) => Some(source),
            _ => None,
        }
    }

    /// Get the path source if this is a path origin.
    pub fn as_path(&self) -> Option<&PathSource> {
        match self {
            Self::Path(source) => Some(source),
            _ => None,
        }
    }

    /// Section label used for this origin kind in the lockfile.
    pub fn section_label(&self) -> &'static str {
        match self {
            Self::Registry => "GEM",
            Self::Git(_) => "GIT",
            Self::Path(_) => "PATH",
        }
    }
}

/// A git checkout pinned to a revision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GitSource {
    /// Repository URL
    pub remote: String,
    /// Locked commit
    pub revision: String,
    /// Branch, tag or ref the revision was resolved from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<GitReference>,
}

impl GitSource {
    pub fn new(remote: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            revision: revision.into(),
            reference: None,
        }
    }

    /// Set the symbolic reference the revision was resolved from.
    pub fn with_reference(mut self, kind: RefKind, value: impl Into<String>) -> Self {
        self.reference = Some(GitReference {
            kind,
            value: value.into(),
        });
        self
    }
}

/// Symbolic git reference (`branch: main`, `tag: v1.0`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GitReference {
    pub kind: RefKind,
    pub value: String,
}

/// Kind of symbolic git reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Branch,
    Tag,
    Ref,
}

impl RefKind {
    /// Parse the key used in a `GIT` section.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "branch" => Some(Self::Branch),
            "tag" => Some(Self::Tag),
            "ref" => Some(Self::Ref),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::Ref => "ref",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A local filesystem source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PathSource {
    /// Path as written in the lockfile (usually relative to the project)
    pub location: String,
}

impl PathSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_accessors() {
        let git = PackageOrigin::git("https://example.com/repo.git", "abc123");
        assert!(git.is_git());
        assert_eq!(git.as_git().unwrap().revision, "abc123");
        assert!(git.as_path().is_none());

        let path = PackageOrigin::path("vendor/local");
        assert!(path.is_path());
        assert_eq!(path.as_path().unwrap().location, "vendor/local");

        assert!(PackageOrigin::Registry.is_registry());
    }

    #[test]
    fn test_section_labels() {
        assert_eq!(PackageOrigin::Registry.section_label(), "GEM");
        assert_eq!(PackageOrigin::git("r", "v").section_label(), "GIT");
        assert_eq!(PackageOrigin::path("p").section_label(), "PATH");
    }

    #[test]
    fn test_ref_kind_keys() {
        for kind in [RefKind::Branch, RefKind::Tag, RefKind::Ref] {
            assert_eq!(RefKind::from_key(kind.as_str()), Some(kind));
        }
        assert_eq!(RefKind::from_key("revision"), None);
    }
}
