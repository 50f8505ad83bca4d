//! Subnet resource - API-side declaration, validated and normalized here,
//! reconciled by the orchestration layer.

use std::collections::BTreeMap;

use reconcile::Ensure;
use serde::Deserialize;

use super::{Ownership, Requirement, Resource, munge_bool, unordered_eq};
use crate::error::{Deprecation, ValidationError};

const IPV6_MODES: [&str; 3] = ["dhcpv6-stateful", "dhcpv6-stateless", "slaac"];

/// A declared subnet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subnet {
    /// Symbolic name for the subnet
    pub name: String,

    #[serde(default)]
    pub ensure: Ensure,

    /// CIDR representing the IP range for this subnet, based on IP version
    #[serde(default)]
    pub cidr: Option<String>,

    /// The IP version of the CIDR (4 or 6)
    #[serde(default)]
    pub ip_version: Option<u8>,

    /// The IPv6 RA (Router Advertisement) mode
    #[serde(default)]
    pub ipv6_ra_mode: Option<String>,

    /// The IPv6 Address mode
    #[serde(default)]
    pub ipv6_address_mode: Option<String>,

    /// Sub-ranges of the cidr available for dynamic allocation to ports,
    /// `"start=IPADDR,end=IPADDR"` each
    #[serde(default)]
    pub allocation_pools: Vec<String>,

    /// The default gateway provided by DHCP to devices in this subnet
    #[serde(default)]
    pub gateway_ip: Option<String>,

    /// Whether DHCP is enabled for this subnet or not
    #[serde(default)]
    pub enable_dhcp: Option<String>,

    /// Routes used by devices with IPs from this subnet,
    /// `"destination=CIDR,nexthop=IP_ADDR"` each
    #[serde(default)]
    pub host_routes: Vec<String>,

    /// DNS name servers used by hosts in this subnet
    #[serde(default)]
    pub dns_nameservers: Vec<String>,

    /// A uuid identifying the network this subnet is associated with
    #[serde(default)]
    pub network_id: Option<String>,

    /// The name of the network this subnet is associated with
    #[serde(default)]
    pub network_name: Option<String>,

    #[serde(flatten)]
    pub ownership: Ownership,

    /// Assigned by the service; declaring it is an error
    #[serde(default)]
    pub id: Option<String>,
}

/// Observed state of a subnet, as gathered by the orchestration layer.
#[derive(Debug, Clone, Default)]
pub struct SubnetObserved {
    pub properties: BTreeMap<String, String>,
    pub allocation_pools: Vec<String>,
    pub host_routes: Vec<String>,
    pub dns_nameservers: Vec<String>,
}

impl Subnet {
    /// Normalized scalar properties, boolean values munged.
    pub fn properties(&self) -> Result<BTreeMap<&'static str, String>, ValidationError> {
        let mut props = BTreeMap::new();
        if let Some(v) = &self.cidr {
            props.insert("cidr", v.clone());
        }
        if let Some(v) = self.ip_version {
            props.insert("ip_version", v.to_string());
        }
        if let Some(v) = &self.ipv6_ra_mode {
            props.insert("ipv6_ra_mode", v.clone());
        }
        if let Some(v) = &self.ipv6_address_mode {
            props.insert("ipv6_address_mode", v.clone());
        }
        if let Some(v) = &self.gateway_ip {
            props.insert("gateway_ip", v.clone());
        }
        if let Some(v) = &self.enable_dhcp {
            props.insert("enable_dhcp", munge_bool("enable_dhcp", v)?);
        }
        if let Some(v) = &self.network_id {
            props.insert("network_id", v.clone());
        }
        if let Some(v) = &self.ownership.project_id {
            props.insert("project_id", v.clone());
        }
        Ok(props)
    }

    /// Whether the observed state matches the declaration. List-valued
    /// properties compare as unordered sets, so ordering differences
    /// alone never count as drift.
    pub fn is_in_sync(&self, observed: &SubnetObserved) -> bool {
        let Ok(props) = self.properties() else {
            return false;
        };
        props
            .iter()
            .all(|(key, desired)| observed.properties.get(*key).is_some_and(|c| c == desired))
            && unordered_eq(&observed.allocation_pools, &self.allocation_pools)
            && unordered_eq(&observed.host_routes, &self.host_routes)
            && unordered_eq(&observed.dns_nameservers, &self.dns_nameservers)
    }

    fn check_cidr(&self) -> Result<(), ValidationError> {
        let cidr = self.cidr.as_deref().map(str::trim).unwrap_or_default();
        if cidr.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                message: "Please provide a valid CIDR".to_string(),
            });
        }
        let invalid = || ValidationError::InvalidValue {
            field: "cidr",
            value: cidr.to_string(),
        };
        let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
        let addr: std::net::IpAddr = addr.parse().map_err(|_| invalid())?;
        let prefix: u8 = prefix.parse().map_err(|_| invalid())?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(invalid());
        }
        Ok(())
    }

    fn check_network(&self) -> Result<(), ValidationError> {
        match (&self.network_id, &self.network_name) {
            (None, None) => Err(ValidationError::MissingRequiredField {
                message: "A value for one of network_name or network_id must be provided"
                    .to_string(),
            }),
            (Some(_), Some(_)) => Err(ValidationError::ConflictingParameters {
                first: "network_name",
                second: "network_id",
            }),
            _ => Ok(()),
        }
    }

    fn check_ipv6_modes(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("ipv6_ra_mode", &self.ipv6_ra_mode),
            ("ipv6_address_mode", &self.ipv6_address_mode),
        ] {
            if let Some(v) = value
                && !IPV6_MODES.contains(&v.as_str())
            {
                return Err(ValidationError::InvalidValue {
                    field,
                    value: v.clone(),
                });
            }
        }

        let uses_ipv6_modes = self.ipv6_ra_mode.is_some() || self.ipv6_address_mode.is_some();
        if uses_ipv6_modes && self.ip_version != Some(6) {
            return Err(ValidationError::InvalidCombination {
                message: "ipv6_ra_mode and ipv6_address_mode can only be used with ip_version \
                          set to '6'"
                    .to_string(),
            });
        }
        Ok(())
    }
}

impl Resource for Subnet {
    fn id(&self) -> String {
        format!("subnet:{}", self.name)
    }

    fn kind(&self) -> &'static str {
        "subnet"
    }

    fn validate(&self) -> Result<Vec<Deprecation>, ValidationError> {
        if self.id.is_some() {
            return Err(ValidationError::ReadOnlyProperty { field: "id" });
        }

        if self.ensure != Ensure::Present {
            return Ok(Vec::new());
        }

        if let Some(version) = self.ip_version
            && version != 4
            && version != 6
        {
            return Err(ValidationError::InvalidValue {
                field: "ip_version",
                value: version.to_string(),
            });
        }

        self.check_cidr()?;
        self.check_network()?;
        self.check_ipv6_modes()?;

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
        if let Some(network) = &self.network_name {
            edges.push(Requirement::Network(network.clone()));
        }
        edges
    }
}
