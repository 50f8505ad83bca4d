//! A batch of settings converging one file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::setting::Setting;

/// An ordered collection of settings that all target one file, plus the
/// purge flag. Duplicate (section, key) identities are a caller error and
/// are rejected at build time, before any file I/O.
#[derive(Debug, Clone)]
pub struct Batch {
    path: PathBuf,
    settings: Vec<Setting>,
    purge: bool,
}

impl Batch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Vec::new(),
            purge: false,
        }
    }

    /// Enable purge: unmanaged keys are deleted after the batch applies.
    pub fn purge(mut self, purge: bool) -> Self {
        self.purge = purge;
        self
    }

    /// Append a setting, rejecting duplicate identities.
    pub fn push(&mut self, setting: Setting) -> Result<()> {
        if self
            .settings
            .iter()
            .any(|existing| existing.id() == setting.id())
        {
            return Err(Error::DuplicateSetting {
                path: self.path.clone(),
                section: setting.section().to_string(),
                key: setting.key().to_string(),
            });
        }
        self.settings.push(setting);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    pub fn is_purge(&self) -> bool {
        self.purge
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Identities named by this batch. Settings that are effectively
    /// absent still count as managed, so purge will not report them twice.
    pub fn managed_ids(&self) -> HashSet<(String, String)> {
        self.settings
            .iter()
            .map(|s| (s.section().to_string(), s.key().to_string()))
            .collect()
    }
}
