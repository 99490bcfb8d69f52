//! Lockfile parse errors.

use thiserror::Error;

/// Errors produced while reading lockfile text or assembling a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockfileError {
    /// An unindented line that is not a valid section label.
    #[error("line {line}: malformed section header: {content:?}")]
    MalformedHeader { line: usize, content: String },

    /// A line inside a recognized section body with an unexpected shape.
    #[error("line {line}: unexpected line in {section} section: {content:?}")]
    Format {
        line: usize,
        section: String,
        content: String,
    },

    /// A required key is absent from a `GIT` or `PATH` section.
    #[error("line {line}: {section} section is missing `{key}:`")]
    MissingKey {
        line: usize,
        section: String,
        key: &'static str,
    },

    /// Two entries share the same name and platform.
    #[error("duplicate locked package {name} ({})", .platform.as_deref().unwrap_or("no platform"))]
    DuplicatePackage {
        name: String,
        platform: Option<String>,
    },

    /// A package name that cannot be written as a `specs:` entry.
    #[error("invalid locked package name {name:?}")]
    InvalidName { name: String },

    /// Two entries with different platforms render as the same `specs:` line.
    #[error("locked package {name} ({rendered}) is ambiguous with an existing entry")]
    AmbiguousEntry { name: String, rendered: String },
}

impl LockfileError {
    pub(crate) fn format(line: usize, section: &str, content: &str) -> Self {
        Self::Format {
            line,
            section: section.to_string(),
            content: content.to_string(),
        }
    }

    /// Line number the error refers to, when it points at input text.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::MalformedHeader { line, .. }
            | Self::Format { line, .. }
            | Self::MissingKey { line, .. } => Some(*line),
            Self::DuplicatePackage { .. }
            | Self::InvalidName { .. }
            | Self::AmbiguousEntry { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_message_names_line_content() {
        let err = LockfileError::format(7, "GEM", "    ???");
        assert_eq!(
            err.to_string(),
            "line 7: unexpected line in GEM section: \"    ???\""
        );
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn test_duplicate_message() {
        let err = LockfileError::DuplicatePackage {
            name: "nokogiri".to_string(),
            platform: Some("java".to_string()),
        };
        assert_eq!(err.to_string(), "duplicate locked package nokogiri (java)");
        assert_eq!(err.line(), None);
    }

    #[test]
    fn test_entry_messages() {
        let err = LockfileError::InvalidName {
            name: String::new(),
        };
        assert_eq!(err.to_string(), "invalid locked package name \"\"");

        let err = LockfileError::AmbiguousEntry {
            name: "a".to_string(),
            rendered: "1.0-beta".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "locked package a (1.0-beta) is ambiguous with an existing entry"
        );
    }
}
