//! Section tokenizer for lockfile text.
//!
//! Format:
//! ```text
//! LABEL
//!   indented body line
//!   indented body line
//!
//! OTHER LABEL
//!    body
//! ```
//!
//! A section starts at an unindented line and runs until the next blank
//! line. Labels may carry a trailing colon. Comment lines (`#`) are ignored.

use super::error::LockfileError;

/// One labelled block of the lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Label without any trailing colon (e.g. "GEM", "RUBY VERSION")
    pub label: String,
    /// 1-based line number of the label
    pub line: usize,
    /// Indented body lines in input order
    pub body: Vec<BodyLine>,
}

/// An indented line inside a section body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLine {
    /// 1-based line number
    pub line: usize,
    /// Number of leading whitespace characters
    pub indent: usize,
    /// Content with surrounding whitespace removed
    pub text: String,
    /// The full line as written (without line terminator)
    pub raw: String,
}

/// Split lockfile text into labelled sections.
pub fn parse_sections(text: &str) -> Result<Vec<Section>, LockfileError> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim_end();
        let text = raw.trim_start();

        if text.is_empty() {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            continue;
        }
        if text.starts_with('#') {
            continue;
        }

        let indent = raw.len() - text.len();
        if indent == 0 {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                label: parse_label(raw, line)?,
                line,
                body: Vec::new(),
            });
            continue;
        }

        match current.as_mut() {
            Some(section) => section.body.push(BodyLine {
                line,
                indent,
                text: text.to_string(),
                raw: raw.to_string(),
            }),
            None => {
                return Err(LockfileError::MalformedHeader {
                    line,
                    content: raw.to_string(),
                });
            }
        }
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }

    Ok(sections)
}

fn parse_label(raw: &str, line: usize) -> Result<String, LockfileError> {
    let label = raw.strip_suffix(':').unwrap_or(raw).trim_end();
    if label.is_empty() || label.contains(':') {
        return Err(LockfileError::MalformedHeader {
            line,
            content: raw.to_string(),
        });
    }
    Ok(label.to_string())
}
