//! The Setting model - one desired assertion about a (section, key) pair.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel value meaning "unset this key, let the service apply its
/// built-in default". A setting whose literal value equals its
/// `ensure_absent_val` behaves as if `ensure` were `Absent`.
pub const SERVICE_DEFAULT: &str = "<SERVICE DEFAULT>";

/// Desired-state verb for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Key must exist with the given value
    Present,
    /// Key must not exist
    Absent,
}

impl Default for Ensure {
    fn default() -> Self {
        Self::Present
    }
}

/// Desired value of a setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Manage the key to this exact string
    Literal(String),
    /// Do not manage the key's value; remove it so the service default wins
    UseDefault,
}

/// A single desired assertion: (section, key) should have this value, or
/// should not exist. Identity within a batch is the (section, key) pair;
/// the batch carries the target file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    section: String,
    key: String,
    value: Value,
    ensure: Ensure,
    secret: bool,
    ensure_absent_val: Option<String>,
}

impl Setting {
    /// Create a setting managing `section/key` to a literal value.
    ///
    /// The value is normalized before storage: surrounding whitespace is
    /// trimmed and boolean literals are capitalized (`true`/`TRUE` become
    /// `True`) so equality checks converge regardless of caller-supplied
    /// case.
    pub fn new(section: &str, key: &str, value: &str) -> Result<Self> {
        if section.trim().is_empty() {
            return Err(Error::EmptySection);
        }
        if key.trim().is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(Self {
            section: section.to_string(),
            key: key.to_string(),
            value: Value::Literal(normalize_value(value)),
            ensure: Ensure::Present,
            secret: false,
            ensure_absent_val: Some(SERVICE_DEFAULT.to_string()),
        })
    }

    /// Create a setting from a `"section/key"` name, the form used by
    /// free-form configuration entries.
    pub fn from_name(name: &str, value: &str) -> Result<Self> {
        let (section, key) = split_name(name)?;
        Self::new(section, key, value)
    }

    /// Create a setting that removes `section/key` if present.
    pub fn absent(section: &str, key: &str) -> Result<Self> {
        let mut setting = Self::new(section, key, "")?;
        setting.value = Value::UseDefault;
        setting.ensure = Ensure::Absent;
        Ok(setting)
    }

    /// Mark the value as secret. Secret values never appear in rendered
    /// reports or logs; the real value is still written to the file.
    pub fn secret(mut self, secret: bool) -> Self {
        self.secret = secret;
        self
    }

    /// Override the sentinel that makes a literal value behave as absent.
    /// `None` disables the sentinel entirely.
    pub fn ensure_absent_val(mut self, sentinel: Option<&str>) -> Self {
        self.ensure_absent_val = sentinel.map(str::to_string);
        self
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// Identity of this setting within its batch.
    pub fn id(&self) -> (&str, &str) {
        (&self.section, &self.key)
    }

    /// The literal value to write, when this setting is effectively present.
    pub fn literal(&self) -> Option<&str> {
        match &self.value {
            Value::Literal(v) => Some(v),
            Value::UseDefault => None,
        }
    }

    /// Whether this setting should remove the key rather than write it.
    ///
    /// True when `ensure` is `Absent`, when the value is `UseDefault`, or
    /// when the literal value equals the `ensure_absent_val` sentinel.
    pub fn effectively_absent(&self) -> bool {
        if self.ensure == Ensure::Absent {
            return true;
        }
        match &self.value {
            Value::UseDefault => true,
            Value::Literal(v) => self
                .ensure_absent_val
                .as_deref()
                .is_some_and(|sentinel| v == sentinel),
        }
    }
}

impl std::fmt::Display for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.section, self.key)
    }
}

/// Split a `"section/key"` name at the first slash.
fn split_name(name: &str) -> Result<(&str, &str)> {
    match name.split_once('/') {
        Some((section, key))
            if !section.is_empty()
                && !key.is_empty()
                && !section.contains(char::is_whitespace)
                && !key.contains(char::is_whitespace) =>
        {
            Ok((section, key))
        }
        _ => Err(Error::InvalidName {
            name: name.to_string(),
        }),
    }
}

/// Trim a raw value and capitalize boolean literals.
///
/// `true`, `TRUE` and `tRuE` all become `True` so an idempotence check
/// against any spelling reports "already in sync".
pub fn normalize_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        "True".to_string()
    } else if trimmed.eq_ignore_ascii_case("false") {
        "False".to_string()
    } else {
        trimmed.to_string()
    }
}
