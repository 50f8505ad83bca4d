//! Macvtap agent resource - converges macvtap_agent.ini.
//!
//! The thinnest of the agent kinds: a file-path override plus a handful
//! of options and free-form settings.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use reconcile::{Batch, SERVICE_DEFAULT, Setting};

use super::{IniResource, Requirement, Resource};
use crate::error::{Deprecation, ValidationError};

fn default_file() -> String {
    "/etc/neutron/plugins/ml2/macvtap_agent.ini".to_string()
}

/// Desired state of the macvtap agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MacvtapAgent {
    /// Target configuration file
    #[serde(default = "default_file")]
    pub file: String,

    /// Delete keys this declaration does not manage
    #[serde(default)]
    pub purge: bool,

    /// `"physnet:interface"` mappings (macvtap section)
    #[serde(default)]
    pub physical_interface_mappings: Option<Vec<String>>,

    /// Agent polling interval in seconds (agent section)
    #[serde(default)]
    pub polling_interval: Option<u32>,

    /// Free-form `"section/key" = value` overrides
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl Default for MacvtapAgent {
    fn default() -> Self {
        Self {
            file: default_file(),
            purge: false,
            physical_interface_mappings: None,
            polling_interval: None,
            settings: BTreeMap::new(),
        }
    }
}

impl Resource for MacvtapAgent {
    fn id(&self) -> String {
        format!("macvtap_agent:{}", self.file)
    }

    fn kind(&self) -> &'static str {
        "macvtap_agent"
    }

    fn validate(&self) -> Result<Vec<Deprecation>, ValidationError> {
        for name in self.settings.keys() {
            if Setting::from_name(name, "").is_err() {
                return Err(ValidationError::InvalidValue {
                    field: "settings",
                    value: name.clone(),
                });
            }
        }
        Ok(Vec::new())
    }

    fn requires(&self) -> Vec<Requirement> {
        vec![Requirement::InstallEnd, Requirement::File(self.file_path())]
    }
}

impl IniResource for MacvtapAgent {
    fn file_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.file).as_ref())
    }

    fn batch(&self) -> reconcile::Result<Batch> {
        let mut batch = Batch::new(self.file_path()).purge(self.purge);

        let mappings = self
            .physical_interface_mappings
            .as_ref()
            .map(|m| m.join(","));
        batch.push(Setting::new(
            "macvtap",
            "physical_interface_mappings",
            mappings.as_deref().unwrap_or(SERVICE_DEFAULT),
        )?)?;
        batch.push(Setting::new(
            "agent",
            "polling_interval",
            self.polling_interval
                .map(|v| v.to_string())
                .as_deref()
                .unwrap_or(SERVICE_DEFAULT),
        )?)?;

        for (name, value) in &self.settings {
            batch.push(Setting::from_name(name, value)?)?;
        }

        Ok(batch)
    }
}
