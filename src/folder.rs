//! Mailbox folders as reported by LIST
//!
//! Each LIST reply line has the shape
//!
//! ```text
//! (\HasNoChildren \Marked) "." "INBOX.Sent"
//! ```
//!
//! i.e. a parenthesized attribute list, the hierarchy delimiter
//! (quoted, or `NIL` for a flat namespace) and the mailbox name
//! (quoted or atom). A leading `* LIST` is tolerated.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Snapshot of one server folder at LIST time.
///
/// # Examples
///
/// ```
/// use mailroom::FolderInfo;
///
/// let folder = FolderInfo::parse(r#"(\HasNoChildren) "." "INBOX.Sent""#).unwrap();
/// assert_eq!(folder.name, "INBOX.Sent");
/// assert_eq!(folder.delimiter, ".");
/// assert!(folder.has_flag("HasNoChildren"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    /// Full hierarchical path.
    pub name: String,
    /// Hierarchy separator; empty when the server reports `NIL`.
    pub delimiter: String,
    /// Attribute tokens without the leading backslash.
    pub flags: Vec<String>,
}

impl FolderInfo {
    /// Parse a single LIST reply line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the line is not a well-formed
    /// LIST response.
    pub fn parse(line: &str) -> Result<Self> {
        let malformed = |why: &str| Error::Parse(format!("Malformed LIST line ({why}): {line}"));

        let rest = line.trim();
        let rest = rest.strip_prefix("* LIST").map_or(rest, str::trim_start);
        let rest = rest
            .strip_prefix('(')
            .ok_or_else(|| malformed("missing attribute list"))?;
        let (attributes, rest) = rest
            .split_once(')')
            .ok_or_else(|| malformed("unterminated attribute list"))?;

        let mut flags: Vec<String> = Vec::new();
        for token in attributes.split_whitespace() {
            let flag = token.trim_start_matches('\\').to_string();
            if !flags.contains(&flag) {
                flags.push(flag);
            }
        }

        let (delimiter, rest) = take_string(rest.trim_start()).ok_or_else(|| malformed("delimiter"))?;
        let (name, _) = take_string(rest.trim_start()).ok_or_else(|| malformed("name"))?;
        let name = name.ok_or_else(|| malformed("NIL name"))?;
        if name.is_empty() {
            return Err(malformed("empty name"));
        }

        Ok(Self {
            name,
            delimiter: delimiter.unwrap_or_default(),
            flags,
        })
    }

    /// Case-insensitive attribute lookup, with or without backslash.
    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        let flag = flag.trim_start_matches('\\');
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }
}

/// Read a quoted string, `NIL`, or an atom. Returns `None` as the
/// value for `NIL`.
fn take_string(input: &str) -> Option<(Option<String>, &str)> {
    if let Some(quoted) = input.strip_prefix('"') {
        let mut value = String::new();
        let mut escaped = false;
        for (idx, c) in quoted.char_indices() {
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                return Some((Some(value), &quoted[idx + 1..]));
            } else {
                value.push(c);
            }
        }
        return None;
    }

    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    let (atom, rest) = input.split_at(end);
    if atom.eq_ignore_ascii_case("NIL") {
        Some((None, rest))
    } else {
        Some((Some(atom.to_string()), rest))
    }
}
