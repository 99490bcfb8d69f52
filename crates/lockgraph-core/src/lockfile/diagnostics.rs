//! Non-fatal findings collected while reading a lockfile.

use std::fmt;

/// A non-fatal finding reported during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A top-level section label that is not recognized. Its body was skipped.
    UnknownSection { label: String, line: usize },
    /// A `key: value` option in a `GIT` or `PATH` section that is not
    /// modeled. The value was dropped.
    IgnoredKey {
        section: String,
        key: String,
        line: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownSection { label, line } => {
                write!(f, "line {}: unknown lockfile section {:?}", line, label)
            }
            Diagnostic::IgnoredKey { section, key, line } => {
                write!(f, "line {}: ignored `{}:` in {} section", line, key, section)
            }
        }
    }
}

/// Diagnostics channel passed into a parse call.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!("{}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
