//! Resource kinds for declarative networking-service configuration.
//!
//! Every declaration is modeled as a Resource with:
//! - Typed validation (domain constraints checked before any file I/O)
//! - Statically-declared dependency edges for the orchestration layer
//! - For INI-backed kinds, a batch of settings for the reconcile engine

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Deprecation, ValidationError};

/// Core trait for all declared resources.
pub trait Resource {
    /// Unique identifier (e.g., "router:gw1", "ml2:/etc/neutron/plugins/ml2/ml2_conf.ini")
    fn id(&self) -> String;

    /// Resource type category (e.g., "router", "subnet", "ml2_plugin")
    fn kind(&self) -> &'static str;

    /// Check domain constraints. Deprecation notices are non-fatal and
    /// returned alongside success.
    fn validate(&self) -> Result<Vec<Deprecation>, ValidationError>;

    /// Dependency edges consumed by the orchestration layer. The
    /// reconcile engine itself never orders resources.
    fn requires(&self) -> Vec<Requirement> {
        Vec::new()
    }
}

/// Resources that converge an INI file.
pub trait IniResource: Resource {
    /// Target file, with `~` already expanded.
    fn file_path(&self) -> PathBuf;

    /// Build the settings batch for this resource.
    fn batch(&self) -> reconcile::Result<reconcile::Batch>;
}

/// A statically-declared dependency edge. Purely informational here; the
/// caller sequences work around package/service lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Service packages must be installed first
    InstallEnd,
    /// The networking service must be running first
    ServiceEnd,
    /// The named project must exist
    Project(String),
    /// The named network must exist
    Network(String),
    /// The target configuration file
    File(PathBuf),
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InstallEnd => write!(f, "install/end"),
            Self::ServiceEnd => write!(f, "service/end"),
            Self::Project(name) => write!(f, "project {name}"),
            Self::Network(name) => write!(f, "network {name}"),
            Self::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

// ============================================================================
// Shared property handling
// ============================================================================

static BOOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(true|false)$").expect("boolean pattern"));

/// Validate a boolean-like property and munge it to its canonical
/// capitalized form (`True`/`False`), so in-sync checks succeed
/// regardless of caller-supplied case.
pub fn munge_bool(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if !BOOL_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidValue {
            field,
            value: value.to_string(),
        });
    }
    let mut munged = trimmed.to_ascii_lowercase();
    munged[..1].make_ascii_uppercase();
    Ok(munged)
}

/// Unordered equality for list-valued properties (allocation pools, host
/// routes, DNS nameservers). Order differences alone do not count as
/// drift.
pub fn unordered_eq<S: AsRef<str>>(current: &[S], desired: &[S]) -> bool {
    let current: HashSet<&str> = current.iter().map(AsRef::as_ref).collect();
    let desired: HashSet<&str> = desired.iter().map(AsRef::as_ref).collect();
    current == desired
}

/// Project/tenant ownership parameters shared by routers and subnets.
/// The tenant_* spellings are deprecated aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ownership {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub tenant_name: Option<String>,
}

impl Ownership {
    /// Exactly one of id/name may be supplied, counting the deprecated
    /// aliases. Using an alias succeeds but emits a deprecation notice.
    pub fn validate(&self, warnings: &mut Vec<Deprecation>) -> Result<(), ValidationError> {
        if self.tenant_id.is_some() {
            warnings.push(Deprecation::new("tenant_id", "project_id"));
        }
        if self.tenant_name.is_some() {
            warnings.push(Deprecation::new("tenant_name", "project_name"));
        }

        let id = self.tenant_id.as_deref().or(self.project_id.as_deref());
        let name = self.tenant_name.as_deref().or(self.project_name.as_deref());
        if id.is_some() && name.is_some() {
            return Err(ValidationError::ConflictingParameters {
                first: "project_name",
                second: "project_id",
            });
        }
        Ok(())
    }

    /// Owning project name for the dependency edge, alias included.
    pub fn owner_name(&self) -> Option<&str> {
        self.tenant_name.as_deref().or(self.project_name.as_deref())
    }
}

// Re-export submodules
pub mod l3_agent;
pub mod macvtap_agent;
pub mod ml2;
pub mod router;
pub mod subnet;

pub use l3_agent::L3Agent;
pub use macvtap_agent::MacvtapAgent;
pub use ml2::Ml2Plugin;
pub use router::Router;
pub use subnet::Subnet;
