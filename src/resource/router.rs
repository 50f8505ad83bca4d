//! Router resource - API-side declaration, validated and normalized here,
//! reconciled by the orchestration layer.

use std::collections::BTreeMap;

use reconcile::Ensure;
use serde::Deserialize;

use super::{Ownership, Requirement, Resource, munge_bool};
use crate::error::{Deprecation, ValidationError};

/// A declared virtual router.
///
/// `id`, `external_gateway_info`, `gateway_network_id` and `status` are
/// assigned by the service; declaring them is an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Router {
    /// Symbolic name for the router
    pub name: String,

    #[serde(default)]
    pub ensure: Ensure,

    /// The administrative status of the router
    #[serde(default)]
    pub admin_state_up: Option<String>,

    /// Is the router distributed or not, default depends on DVR state
    #[serde(default)]
    pub distributed: Option<String>,

    /// Is the router of HA type or not, default depends on L3 HA state
    #[serde(default)]
    pub ha: Option<String>,

    /// The name of the external network this router connects to for
    /// gateway services (e.g. NAT)
    #[serde(default)]
    pub gateway_network_name: Option<String>,

    /// The availability zone hint to provide the scheduler
    #[serde(default)]
    pub availability_zone_hint: Option<String>,

    #[serde(flatten)]
    pub ownership: Ownership,

    // Read-only properties; present so a declaration that tries to set
    // them fails validation instead of being silently dropped.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub external_gateway_info: Option<String>,
    #[serde(default)]
    pub gateway_network_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Router {
    /// Normalized properties the orchestration layer manages, boolean
    /// values munged to their canonical form.
    pub fn properties(&self) -> Result<BTreeMap<&'static str, String>, ValidationError> {
        let mut props = BTreeMap::new();
        if let Some(v) = &self.admin_state_up {
            props.insert("admin_state_up", munge_bool("admin_state_up", v)?);
        }
        if let Some(v) = &self.distributed {
            props.insert("distributed", munge_bool("distributed", v)?);
        }
        if let Some(v) = &self.ha {
            props.insert("ha", munge_bool("ha", v)?);
        }
        if let Some(v) = &self.gateway_network_name {
            props.insert("gateway_network_name", v.clone());
        }
        if let Some(v) = &self.availability_zone_hint {
            props.insert("availability_zone_hint", v.clone());
        }
        if let Some(v) = &self.ownership.project_id {
            props.insert("project_id", v.clone());
        }
        Ok(props)
    }

    /// Whether the observed state already matches every managed property.
    pub fn is_in_sync(&self, current: &BTreeMap<String, String>) -> bool {
        match self.properties() {
            Ok(props) => props
                .iter()
                .all(|(key, desired)| current.get(*key).is_some_and(|c| c == desired)),
            Err(_) => false,
        }
    }

    fn check_read_only(&self) -> Result<(), ValidationError> {
        let read_only: [(&'static str, &Option<String>); 4] = [
            ("id", &self.id),
            ("external_gateway_info", &self.external_gateway_info),
            ("gateway_network_id", &self.gateway_network_id),
            ("status", &self.status),
        ];
        for (field, value) in read_only {
            if value.is_some() {
                return Err(ValidationError::ReadOnlyProperty { field });
            }
        }
        Ok(())
    }
}

impl Resource for Router {
    fn id(&self) -> String {
        format!("router:{}", self.name)
    }

    fn kind(&self) -> &'static str {
        "router"
    }

    fn validate(&self) -> Result<Vec<Deprecation>, ValidationError> {
        self.check_read_only()?;

        if self.ensure != Ensure::Present {
            return Ok(Vec::new());
        }

        let mut warnings = Vec::new();
        self.ownership.validate(&mut warnings)?;
        self.properties()?;
        Ok(warnings)
    }

    fn requires(&self) -> Vec<Requirement> {
        let mut edges = vec![Requirement::ServiceEnd];
        if let Some(owner) = self.ownership.owner_name() {
            edges.push(Requirement::Project(owner.to_string()));
        }
        if let Some(network) = &self.gateway_network_name {
            edges.push(Requirement::Network(network.clone()));
        }
        edges
    }
}
