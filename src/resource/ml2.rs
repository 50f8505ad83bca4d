//! ML2 plugin resource - converges ml2_conf.ini.
//!
//! Driver lists are joined with commas; options left unset render as the
//! service-default sentinel so previously-managed keys get unset. The
//! per-type-driver sections (flat/vlan/gre/vxlan/geneve) are only managed
//! when the corresponding driver is enabled.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use reconcile::{Batch, SERVICE_DEFAULT, Setting};

use super::{IniResource, Requirement, Resource};
use crate::error::{Deprecation, ValidationError};
use crate::validate::{
    GRE_MAX_TUNNEL_ID, is_multicast_ipv4, validate_tunnel_id_ranges, validate_vlan_ranges,
    validate_vni_ranges,
};

const KNOWN_TYPE_DRIVERS: [&str; 6] = ["local", "flat", "vlan", "gre", "vxlan", "geneve"];

static SETTING_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+/\S+$").expect("setting name pattern"));

fn default_file() -> String {
    "/etc/neutron/plugins/ml2/ml2_conf.ini".to_string()
}

fn default_type_drivers() -> Vec<String> {
    ["local", "flat", "vlan", "gre", "vxlan", "geneve"]
        .map(str::to_string)
        .to_vec()
}

fn default_tenant_network_types() -> Vec<String> {
    ["local", "flat", "vlan", "gre", "vxlan"]
        .map(str::to_string)
        .to_vec()
}

fn default_mechanism_drivers() -> Vec<String> {
    vec!["openvswitch".to_string()]
}

/// Desired state of the ML2 core plugin configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Ml2Plugin {
    /// Target configuration file
    #[serde(default = "default_file")]
    pub file: String,

    /// Delete keys this declaration does not manage
    #[serde(default)]
    pub purge: bool,

    #[serde(default = "default_type_drivers")]
    pub type_drivers: Vec<String>,

    #[serde(default = "default_tenant_network_types")]
    pub tenant_network_types: Vec<String>,

    #[serde(default = "default_mechanism_drivers")]
    pub mechanism_drivers: Vec<String>,

    #[serde(default)]
    pub extension_drivers: Option<Vec<String>>,

    /// Physical networks usable for flat networks; `*` allows all
    #[serde(default)]
    pub flat_networks: Option<Vec<String>>,

    /// `"start:end"` VLAN ID ranges per physical network
    #[serde(default)]
    pub network_vlan_ranges: Option<Vec<String>>,

    /// `"start:end"` GRE tunnel id ranges
    #[serde(default)]
    pub tunnel_id_ranges: Option<Vec<String>>,

    /// `"start:end"` VXLAN VNI ranges (also used by geneve)
    #[serde(default)]
    pub vni_ranges: Option<Vec<String>>,

    /// Multicast group for VXLAN broadcast emulation
    #[serde(default)]
    pub vxlan_group: Option<String>,

    /// Geneve maximum header size
    #[serde(default)]
    pub max_header_size: Option<u32>,

    #[serde(default)]
    pub path_mtu: Option<String>,

    /// `"physnet:mtu"` pairs; empty list unsets the key
    #[serde(default)]
    pub physical_network_mtus: Option<Vec<String>>,

    #[serde(default)]
    pub overlay_ip_version: Option<u8>,

    #[serde(default)]
    pub enable_security_group: Option<bool>,

    /// Free-form `"section/key" = value` overrides
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl Default for Ml2Plugin {
    fn default() -> Self {
        Self {
            file: default_file(),
            purge: false,
            type_drivers: default_type_drivers(),
            tenant_network_types: default_tenant_network_types(),
            mechanism_drivers: default_mechanism_drivers(),
            extension_drivers: None,
            flat_networks: None,
            network_vlan_ranges: None,
            tunnel_id_ranges: None,
            vni_ranges: None,
            vxlan_group: None,
            max_header_size: None,
            path_mtu: None,
            physical_network_mtus: None,
            overlay_ip_version: None,
            enable_security_group: None,
            settings: BTreeMap::new(),
        }
    }
}

impl Ml2Plugin {
    fn has_driver(&self, driver: &str) -> bool {
        self.type_drivers.iter().any(|d| d == driver)
    }

    /// A literal setting when a value is present, the service-default
    /// sentinel otherwise.
    fn opt(section: &str, key: &str, value: Option<String>) -> reconcile::Result<Setting> {
        match value {
            Some(v) => Setting::new(section, key, &v),
            None => Setting::new(section, key, SERVICE_DEFAULT),
        }
    }
}

impl Resource for Ml2Plugin {
    fn id(&self) -> String {
        format!("ml2:{}", self.file)
    }

    fn kind(&self) -> &'static str {
        "ml2_plugin"
    }

    fn validate(&self) -> Result<Vec<Deprecation>, ValidationError> {
        for driver in &self.type_drivers {
            if !KNOWN_TYPE_DRIVERS.contains(&driver.as_str()) {
                log::warn!("type_driver unknown.");
            }
        }

        if let Some(ranges) = &self.network_vlan_ranges {
            validate_vlan_ranges(ranges)?;
        }
        if let Some(ranges) = &self.tunnel_id_ranges {
            validate_tunnel_id_ranges("tunnel id", ranges, GRE_MAX_TUNNEL_ID)?;
        }
        if let Some(ranges) = &self.vni_ranges {
            validate_vni_ranges(ranges)?;
        }

        if let Some(group) = &self.vxlan_group
            && !is_multicast_ipv4(group)
        {
            return Err(ValidationError::InvalidAddress {
                address: group.clone(),
                field: "vxlan_group",
            });
        }

        if let Some(version) = self.overlay_ip_version
            && version != 4
            && version != 6
        {
            return Err(ValidationError::InvalidValue {
                field: "overlay_ip_version",
                value: version.to_string(),
            });
        }

        for name in self.settings.keys() {
            if !SETTING_NAME_RE.is_match(name) {
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

impl IniResource for Ml2Plugin {
    fn file_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.file).as_ref())
    }

    fn batch(&self) -> reconcile::Result<Batch> {
        let mut batch = Batch::new(self.file_path()).purge(self.purge);

        batch.push(Setting::new("ml2", "type_drivers", &self.type_drivers.join(","))?)?;
        batch.push(Setting::new(
            "ml2",
            "tenant_network_types",
            &self.tenant_network_types.join(","),
        )?)?;
        batch.push(Setting::new(
            "ml2",
            "mechanism_drivers",
            &self.mechanism_drivers.join(","),
        )?)?;
        batch.push(Self::opt(
            "ml2",
            "extension_drivers",
            self.extension_drivers.as_ref().map(|d| d.join(",")),
        )?)?;
        batch.push(Self::opt("ml2", "path_mtu", self.path_mtu.clone())?)?;
        match &self.physical_network_mtus {
            Some(mtus) if !mtus.is_empty() => {
                batch.push(Setting::new("ml2", "physical_network_mtus", &mtus.join(","))?)?;
            }
            Some(_) => batch.push(Setting::absent("ml2", "physical_network_mtus")?)?,
            None => batch.push(Self::opt("ml2", "physical_network_mtus", None)?)?,
        }
        batch.push(Self::opt(
            "ml2",
            "overlay_ip_version",
            self.overlay_ip_version.map(|v| v.to_string()),
        )?)?;
        batch.push(Self::opt(
            "securitygroup",
            "enable_security_group",
            self.enable_security_group.map(|v| v.to_string()),
        )?)?;

        if self.has_driver("flat") {
            batch.push(Self::opt(
                "ml2_type_flat",
                "flat_networks",
                self.flat_networks.as_ref().map(|n| n.join(",")),
            )?)?;
        }
        if self.has_driver("vlan") {
            batch.push(Self::opt(
                "ml2_type_vlan",
                "network_vlan_ranges",
                self.network_vlan_ranges.as_ref().map(|r| r.join(",")),
            )?)?;
        }
        if self.has_driver("gre") {
            batch.push(Self::opt(
                "ml2_type_gre",
                "tunnel_id_ranges",
                self.tunnel_id_ranges.as_ref().map(|r| r.join(",")),
            )?)?;
        }
        if self.has_driver("vxlan") {
            batch.push(Self::opt(
                "ml2_type_vxlan",
                "vni_ranges",
                self.vni_ranges.as_ref().map(|r| r.join(",")),
            )?)?;
            batch.push(Self::opt(
                "ml2_type_vxlan",
                "vxlan_group",
                self.vxlan_group.clone(),
            )?)?;
        }
        if self.has_driver("geneve") {
            batch.push(Self::opt(
                "ml2_type_geneve",
                "vni_ranges",
                self.vni_ranges.as_ref().map(|r| r.join(",")),
            )?)?;
            batch.push(Self::opt(
                "ml2_type_geneve",
                "max_header_size",
                self.max_header_size.map(|v| v.to_string()),
            )?)?;
        }

        for (name, value) in &self.settings {
            batch.push(Setting::from_name(name, value)?)?;
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_of<'a>(batch: &'a Batch, section: &str, key: &str) -> Option<&'a str> {
        batch
            .settings()
            .iter()
            .find(|s| s.section() == section && s.key() == key)
            .and_then(|s| s.literal())
    }

    fn is_absent(batch: &Batch, section: &str, key: &str) -> bool {
        batch
            .settings()
            .iter()
            .find(|s| s.section() == section && s.key() == key)
            .is_some_and(reconcile::Setting::effectively_absent)
    }

    #[test]
    fn defaults_validate_and_build() {
        let plugin = Ml2Plugin::default();
        assert!(plugin.validate().is_ok());

        let batch = plugin.batch().unwrap();
        assert_eq!(
            value_of(&batch, "ml2", "type_drivers"),
            Some("local,flat,vlan,gre,vxlan,geneve")
        );
        assert_eq!(
            value_of(&batch, "ml2", "tenant_network_types"),
            Some("local,flat,vlan,gre,vxlan")
        );
        assert_eq!(value_of(&batch, "ml2", "mechanism_drivers"), Some("openvswitch"));
        // Unset options fall back to the service default, i.e. absent.
        assert!(is_absent(&batch, "ml2", "extension_drivers"));
        assert!(is_absent(&batch, "ml2", "overlay_ip_version"));
        assert!(is_absent(&batch, "securitygroup", "enable_security_group"));
    }

    #[test]
    fn driver_sections_follow_type_drivers() {
        let plugin = Ml2Plugin {
            type_drivers: vec!["local".to_string(), "flat".to_string()],
            network_vlan_ranges: Some(vec!["10:50".to_string()]),
            ..Default::default()
        };
        let batch = plugin.batch().unwrap();
        assert!(
            batch
                .settings()
                .iter()
                .any(|s| s.section() == "ml2_type_flat"),
            "flat section must be managed when the flat driver is enabled"
        );
        assert!(
            batch
                .settings()
                .iter()
                .all(|s| s.section() != "ml2_type_vlan"),
            "vlan section must not be managed without the vlan driver"
        );
    }

    #[test]
    fn vlan_ranges_are_written() {
        let plugin = Ml2Plugin {
            network_vlan_ranges: Some(vec!["1:20".to_string(), "400:4094".to_string()]),
            ..Default::default()
        };
        assert!(plugin.validate().is_ok());
        let batch = plugin.batch().unwrap();
        assert_eq!(
            value_of(&batch, "ml2_type_vlan", "network_vlan_ranges"),
            Some("1:20,400:4094")
        );
    }

    #[test]
    fn invalid_vlan_id_fails() {
        let plugin = Ml2Plugin {
            network_vlan_ranges: Some(vec!["1:20".to_string(), "400:4099".to_string()]),
            ..Default::default()
        };
        let err = plugin.validate().unwrap_err();
        assert_eq!(err.to_string(), "vlan id are invalid.");
    }

    #[test]
    fn inverted_vlan_range_fails_distinctly() {
        let plugin = Ml2Plugin {
            network_vlan_ranges: Some(vec!["2938:1".to_string()]),
            ..Default::default()
        };
        let err = plugin.validate().unwrap_err();
        assert_eq!(err.to_string(), "vlan ranges are invalid.");
    }

    #[test]
    fn oversized_tunnel_id_fails() {
        let plugin = Ml2Plugin {
            tunnel_id_ranges: Some(vec!["0:20".to_string(), "40:10000000000".to_string()]),
            ..Default::default()
        };
        let err = plugin.validate().unwrap_err();
        assert_eq!(err.to_string(), "tunnel id ranges are to large.");
    }

    #[test]
    fn inverted_vni_range_fails() {
        let plugin = Ml2Plugin {
            vni_ranges: Some(vec!["2938:1".to_string()]),
            ..Default::default()
        };
        let err = plugin.validate().unwrap_err();
        assert_eq!(err.to_string(), "vni ranges are invalid.");
    }

    #[test]
    fn vxlan_group_must_be_multicast() {
        let plugin = Ml2Plugin {
            vxlan_group: Some("192.1.1.1".to_string()),
            ..Default::default()
        };
        let err = plugin.validate().unwrap_err();
        assert_eq!(err.to_string(), "192.1.1.1 is not valid for vxlan_group");

        let plugin = Ml2Plugin {
            vxlan_group: Some("224.1.1.1".to_string()),
            vni_ranges: Some(vec!["40:300".to_string(), "500:1000".to_string()]),
            ..Default::default()
        };
        assert!(plugin.validate().is_ok());
        let batch = plugin.batch().unwrap();
        assert_eq!(value_of(&batch, "ml2_type_vxlan", "vxlan_group"), Some("224.1.1.1"));
        assert_eq!(value_of(&batch, "ml2_type_vxlan", "vni_ranges"), Some("40:300,500:1000"));
    }

    #[test]
    fn overlay_ip_version_accepts_only_4_and_6() {
        for version in [4u8, 6] {
            let plugin = Ml2Plugin {
                overlay_ip_version: Some(version),
                ..Default::default()
            };
            assert!(plugin.validate().is_ok());
        }
        let plugin = Ml2Plugin {
            overlay_ip_version: Some(10),
            ..Default::default()
        };
        assert!(plugin.validate().is_err());
    }

    #[test]
    fn geneve_settings() {
        let plugin = Ml2Plugin {
            vni_ranges: Some(vec!["40:300".to_string(), "500:1000".to_string()]),
            max_header_size: Some(50),
            ..Default::default()
        };
        let batch = plugin.batch().unwrap();
        assert_eq!(
            value_of(&batch, "ml2_type_geneve", "vni_ranges"),
            Some("40:300,500:1000")
        );
        assert_eq!(value_of(&batch, "ml2_type_geneve", "max_header_size"), Some("50"));
    }

    #[test]
    fn empty_physical_network_mtus_unsets_the_key() {
        let plugin = Ml2Plugin {
            physical_network_mtus: Some(Vec::new()),
            ..Default::default()
        };
        let batch = plugin.batch().unwrap();
        assert!(is_absent(&batch, "ml2", "physical_network_mtus"));

        let plugin = Ml2Plugin {
            physical_network_mtus: Some(vec!["physnet1:9000".to_string()]),
            ..Default::default()
        };
        let batch = plugin.batch().unwrap();
        assert_eq!(
            value_of(&batch, "ml2", "physical_network_mtus"),
            Some("physnet1:9000")
        );
    }

    #[test]
    fn security_group_flag_is_normalized() {
        let plugin = Ml2Plugin {
            enable_security_group: Some(true),
            ..Default::default()
        };
        let batch = plugin.batch().unwrap();
        assert_eq!(
            value_of(&batch, "securitygroup", "enable_security_group"),
            Some("True")
        );
    }

    #[test]
    fn free_form_settings_are_included() {
        let mut settings = BTreeMap::new();
        settings.insert("agent/polling_interval".to_string(), "2".to_string());
        let plugin = Ml2Plugin {
            settings,
            ..Default::default()
        };
        assert!(plugin.validate().is_ok());
        let batch = plugin.batch().unwrap();
        assert_eq!(value_of(&batch, "agent", "polling_interval"), Some("2"));
    }

    #[test]
    fn malformed_free_form_name_fails_validation() {
        let mut settings = BTreeMap::new();
        settings.insert("no-slash".to_string(), "2".to_string());
        let plugin = Ml2Plugin {
            settings,
            ..Default::default()
        };
        assert!(plugin.validate().is_err());
    }

    #[test]
    fn purge_flag_reaches_the_batch() {
        let plugin = Ml2Plugin {
            purge: true,
            ..Default::default()
        };
        assert!(plugin.batch().unwrap().is_purge());
        assert!(!Ml2Plugin::default().batch().unwrap().is_purge());
    }

    #[test]
    fn path_mtu_round_trip_value() {
        let plugin = Ml2Plugin {
            path_mtu: Some("9000".to_string()),
            ..Default::default()
        };
        let batch = plugin.batch().unwrap();
        assert_eq!(value_of(&batch, "ml2", "path_mtu"), Some("9000"));
    }
}
