//! L3 agent resource - converges l3_agent.ini.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use reconcile::{Batch, SERVICE_DEFAULT, Setting};

use super::{IniResource, Requirement, Resource};
use crate::error::{Deprecation, ValidationError};

const AGENT_MODES: [&str; 3] = ["legacy", "dvr", "dvr_snat"];
const VRRP_AUTH_TYPES: [&str; 2] = ["PASS", "AH"];

fn default_file() -> String {
    "/etc/neutron/l3_agent.ini".to_string()
}

fn default_interface_driver() -> String {
    "neutron.agent.linux.interface.OVSInterfaceDriver".to_string()
}

fn default_agent_mode() -> String {
    "legacy".to_string()
}

fn default_vrrp_auth_type() -> String {
    "PASS".to_string()
}

fn default_vrrp_advert_int() -> String {
    "3".to_string()
}

/// Extensions accept either a comma-joined string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn join(&self) -> String {
        match self {
            Self::One(s) => s.clone(),
            Self::Many(items) => items.join(","),
        }
    }
}

/// Desired state of the L3 agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct L3Agent {
    /// Target configuration file
    #[serde(default = "default_file")]
    pub file: String,

    /// Delete keys this declaration does not manage
    #[serde(default)]
    pub purge: bool,

    #[serde(default = "default_interface_driver")]
    pub interface_driver: String,

    /// legacy, dvr or dvr_snat
    #[serde(default = "default_agent_mode")]
    pub agent_mode: String,

    #[serde(default)]
    pub debug: Option<bool>,

    #[serde(default)]
    pub handle_internal_only_routers: Option<bool>,

    #[serde(default)]
    pub metadata_port: Option<u16>,

    #[serde(default)]
    pub periodic_interval: Option<u32>,

    #[serde(default)]
    pub periodic_fuzzy_delay: Option<u32>,

    #[serde(default)]
    pub enable_metadata_proxy: Option<bool>,

    /// User radvd drops privileges to
    #[serde(default)]
    pub radvd_user: Option<String>,

    #[serde(default)]
    pub rpc_response_max_timeout: Option<u32>,

    /// OVS integration bridge override (ovs section)
    #[serde(default)]
    pub ovs_integration_bridge: Option<String>,

    /// Availability zone of this agent (agent section)
    #[serde(default)]
    pub availability_zone: Option<String>,

    /// L3 agent extensions, list or comma-joined string (agent section)
    #[serde(default)]
    pub extensions: Option<StringOrList>,

    #[serde(default)]
    pub report_interval: Option<u32>,

    // network_log section
    #[serde(default)]
    pub network_log_rate_limit: Option<u32>,
    #[serde(default)]
    pub network_log_burst_limit: Option<u32>,
    #[serde(default)]
    pub network_log_local_output_log_base: Option<String>,

    /// Manage VRRP settings for HA routers; when disabled the VRRP keys
    /// are removed from the file
    #[serde(default)]
    pub ha_enabled: bool,

    #[serde(default = "default_vrrp_auth_type")]
    pub ha_vrrp_auth_type: String,

    /// VRRP authentication password; never shown in reports or logs
    #[serde(default)]
    pub ha_vrrp_auth_password: Option<String>,

    #[serde(default = "default_vrrp_advert_int")]
    pub ha_vrrp_advert_int: String,

    /// Free-form `"section/key" = value` overrides
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl Default for L3Agent {
    fn default() -> Self {
        // Field defaults match the serde defaults above.
        toml::from_str("").expect("empty L3 agent declaration")
    }
}

impl L3Agent {
    fn opt(section: &str, key: &str, value: Option<String>) -> reconcile::Result<Setting> {
        match value {
            Some(v) => Setting::new(section, key, &v),
            None => Setting::new(section, key, SERVICE_DEFAULT),
        }
    }
}

impl Resource for L3Agent {
    fn id(&self) -> String {
        format!("l3_agent:{}", self.file)
    }

    fn kind(&self) -> &'static str {
        "l3_agent"
    }

    fn validate(&self) -> Result<Vec<Deprecation>, ValidationError> {
        if !AGENT_MODES.contains(&self.agent_mode.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "agent_mode",
                value: self.agent_mode.clone(),
            });
        }
        if self.ha_enabled && !VRRP_AUTH_TYPES.contains(&self.ha_vrrp_auth_type.as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "ha_vrrp_auth_type",
                value: self.ha_vrrp_auth_type.clone(),
            });
        }
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

impl IniResource for L3Agent {
    fn file_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.file).as_ref())
    }

    fn batch(&self) -> reconcile::Result<Batch> {
        let mut batch = Batch::new(self.file_path()).purge(self.purge);

        batch.push(Setting::new("DEFAULT", "interface_driver", &self.interface_driver)?)?;
        batch.push(Setting::new("DEFAULT", "agent_mode", &self.agent_mode)?)?;
        batch.push(Self::opt(
            "DEFAULT",
            "debug",
            self.debug.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "DEFAULT",
            "handle_internal_only_routers",
            self.handle_internal_only_routers.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "DEFAULT",
            "metadata_port",
            self.metadata_port.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "DEFAULT",
            "periodic_interval",
            self.periodic_interval.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "DEFAULT",
            "periodic_fuzzy_delay",
            self.periodic_fuzzy_delay.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "DEFAULT",
            "enable_metadata_proxy",
            self.enable_metadata_proxy.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt("DEFAULT", "radvd_user", self.radvd_user.clone())?)?;
        batch.push(Self::opt(
            "DEFAULT",
            "rpc_response_max_timeout",
            self.rpc_response_max_timeout.map(|v| v.to_string()),
        )?)?;

        // VRRP keys are managed as a block: present with ha, absent without.
        if self.ha_enabled {
            batch.push(Setting::new("DEFAULT", "ha_vrrp_auth_type", &self.ha_vrrp_auth_type)?)?;
            batch.push(
                Self::opt(
                    "DEFAULT",
                    "ha_vrrp_auth_password",
                    self.ha_vrrp_auth_password.clone(),
                )?
                .secret(true),
            )?;
            batch.push(Setting::new(
                "DEFAULT",
                "ha_vrrp_advert_int",
                &self.ha_vrrp_advert_int,
            )?)?;
        } else {
            batch.push(Setting::absent("DEFAULT", "ha_vrrp_auth_type")?)?;
            batch.push(Setting::absent("DEFAULT", "ha_vrrp_auth_password")?)?;
            batch.push(Setting::absent("DEFAULT", "ha_vrrp_advert_int")?)?;
        }

        batch.push(Self::opt(
            "ovs",
            "integration_bridge",
            self.ovs_integration_bridge.clone(),
        )?)?;
        batch.push(Self::opt(
            "agent",
            "availability_zone",
            self.availability_zone.clone(),
        )?)?;
        batch.push(Self::opt(
            "agent",
            "extensions",
            self.extensions.as_ref().map(StringOrList::join),
        )?)?;
        batch.push(Self::opt(
            "agent",
            "report_interval",
            self.report_interval.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "network_log",
            "rate_limit",
            self.network_log_rate_limit.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "network_log",
            "burst_limit",
            self.network_log_burst_limit.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "network_log",
            "local_output_log_base",
            self.network_log_local_output_log_base.clone(),
        )?)?;

        for (name, value) in &self.settings {
            batch.push(Setting::from_name(name, value)?)?;
        }

        Ok(batch)
    }
}
