//! Error types for settings reconciliation.
//!
//! Validation-shaped errors (bad names, duplicate identities) are raised
//! before any file I/O. File errors abort the whole batch; the target file
//! is never left partially written.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while building or applying a batch.
#[derive(Debug, Error)]
pub enum Error {
    /// Target file could not be read, locked, or written
    #[error("cannot access {path}: {source}")]
    FileAccess {
        /// Path of the file the operation targeted
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Target file content is not valid INI
    #[error("cannot parse {path} at line {line}: {reason}")]
    Parse {
        /// Path of the file being parsed
        path: PathBuf,
        /// 1-based line number of the offending line
        line: usize,
        /// What was wrong with the line
        reason: String,
    },

    /// Two settings in one batch share a (section, key) identity
    #[error("duplicate setting {section}/{key} in batch for {path}")]
    DuplicateSetting {
        path: PathBuf,
        section: String,
        key: String,
    },

    /// A setting name did not match the `section/key` shape
    #[error("invalid setting name {name:?}: expected section/key")]
    InvalidName { name: String },

    /// A setting was constructed with an empty section
    #[error("setting section must not be empty")]
    EmptySection,

    /// A setting was constructed with an empty key
    #[error("setting key must not be empty")]
    EmptyKey,
}

impl Error {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
