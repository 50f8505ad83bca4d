//! Validation errors for desired-state resources.
//!
//! Every variant names the offending field and constraint; automated
//! tooling pattern-matches on the message text, so the historical
//! wording is part of the contract. All of these are raised before any
//! file I/O - a batch with an invalid resource is never partially
//! applied.

use thiserror::Error;

/// A domain-constraint violation in a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Attempt to set a property only the service may assign
    #[error("{field} is a read only property")]
    ReadOnlyProperty { field: &'static str },

    /// Two parameters that may not be combined were both supplied
    #[error("please provide a value for only one of {first} and {second}")]
    ConflictingParameters {
        first: &'static str,
        second: &'static str,
    },

    /// A required parameter is missing or empty
    #[error("{message}")]
    MissingRequiredField { message: String },

    /// Parameters that are individually valid but invalid together
    #[error("{message}")]
    InvalidCombination { message: String },

    /// A `start:end` range is malformed or out of bounds
    #[error("{message}")]
    InvalidRange { message: String },

    /// An address field does not hold the kind of address it requires
    #[error("{address} is not valid for {field}")]
    InvalidAddress { address: String, field: &'static str },

    /// A value outside the property's accepted set
    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: &'static str, value: String },
}

/// Non-fatal notice that a deprecated parameter was used. Surfaced to the
/// caller; never blocks validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub message: String,
}

impl Deprecation {
    pub fn new(old: &str, new: &str) -> Self {
        Self {
            message: format!("The {old} property is deprecated. Use {new}."),
        }
    }
}

impl std::fmt::Display for Deprecation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
