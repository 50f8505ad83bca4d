//! Change reports - what a reconciliation did (or would do).
//!
//! Reports are the only thing callers render, so redaction lives here:
//! a change carrying a secret setting never exposes the real value
//! through `Display`, the redacted accessors, or serialization.

use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Mask shown in place of a secret's previous value.
pub const OLD_SECRET: &str = "[old secret redacted]";
/// Mask shown in place of a secret's new value.
pub const NEW_SECRET: &str = "[new secret redacted]";

/// What happened to one (section, key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
    Removed,
}

/// One applied (or planned) edit.
#[derive(Debug, Clone)]
pub struct Change {
    pub section: String,
    pub key: String,
    pub kind: ChangeKind,
    old: Option<String>,
    new: Option<String>,
    secret: bool,
}

impl Change {
    pub fn added(section: &str, key: &str, new: &str, secret: bool) -> Self {
        Self {
            section: section.to_string(),
            key: key.to_string(),
            kind: ChangeKind::Added,
            old: None,
            new: Some(new.to_string()),
            secret,
        }
    }

    pub fn changed(section: &str, key: &str, old: String, new: &str, secret: bool) -> Self {
        Self {
            section: section.to_string(),
            key: key.to_string(),
            kind: ChangeKind::Changed,
            old: Some(old),
            new: Some(new.to_string()),
            secret,
        }
    }

    pub fn removed(section: &str, key: &str, old: String, secret: bool) -> Self {
        Self {
            section: section.to_string(),
            key: key.to_string(),
            kind: ChangeKind::Removed,
            old: Some(old),
            new: None,
            secret,
        }
    }

    /// Previous value, masked when the setting is secret.
    pub fn old_display(&self) -> Option<&str> {
        match (&self.old, self.secret) {
            (Some(_), true) => Some(OLD_SECRET),
            (Some(v), false) => Some(v),
            (None, _) => None,
        }
    }

    /// New value, masked when the setting is secret.
    pub fn new_display(&self) -> Option<&str> {
        match (&self.new, self.secret) {
            (Some(_), true) => Some(NEW_SECRET),
            (Some(v), false) => Some(v),
            (None, _) => None,
        }
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ChangeKind::Added => write!(
                f,
                "{}/{} = {}",
                self.section,
                self.key,
                self.new_display().unwrap_or_default()
            ),
            ChangeKind::Changed => write!(
                f,
                "{}/{}: {} -> {}",
                self.section,
                self.key,
                self.old_display().unwrap_or_default(),
                self.new_display().unwrap_or_default()
            ),
            ChangeKind::Removed => write!(
                f,
                "{}/{} removed (was {})",
                self.section,
                self.key,
                self.old_display().unwrap_or_default()
            ),
        }
    }
}

// Hand-written so serialized reports go through the redacting accessors.
impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Change", 5)?;
        s.serialize_field("section", &self.section)?;
        s.serialize_field("key", &self.key)?;
        s.serialize_field("kind", &self.kind)?;
        s.serialize_field("old", &self.old_display())?;
        s.serialize_field("new", &self.new_display())?;
        s.end()
    }
}

/// Everything one `apply` (or `plan`) did to a single file.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeReport {
    /// Target file
    pub path: PathBuf,
    /// Edits in application order
    pub changes: Vec<Change>,
    /// Whether the file was actually rewritten (always false for plans)
    pub written: bool,
}

impl ChangeReport {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            changes: Vec::new(),
            written: false,
        }
    }

    /// True when the file already matched the desired state.
    pub fn is_in_sync(&self) -> bool {
        self.changes.is_empty()
    }
}
