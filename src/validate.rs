//! Pure range and address validators.
//!
//! Standalone, side-effect-free functions shared by the resource kinds.
//! Message text is load-bearing: "<kind> ranges are invalid." means the
//! range itself is malformed (start > end or unparsable), while
//! "<kind> id are invalid." / "<kind> ranges are to large." mean an
//! endpoint fell outside the protocol bound. Callers distinguish the two
//! by message.

use std::net::Ipv4Addr;

use crate::error::ValidationError;

/// Valid VLAN IDs per 802.1Q.
pub const VLAN_MIN: u64 = 1;
pub const VLAN_MAX: u64 = 4094;

/// GRE carries a 32-bit tunnel key.
pub const GRE_MAX_TUNNEL_ID: u64 = u32::MAX as u64;

/// VXLAN (and Geneve) VNIs are 24-bit.
pub const VNI_MAX: u64 = (1 << 24) - 1;

/// Parse a `"start:end"` range into its endpoints.
///
/// `kind` names the range family in error messages ("vlan", "tunnel id",
/// "vni").
pub fn parse_range(kind: &str, range: &str) -> Result<(u64, u64), ValidationError> {
    let invalid = || ValidationError::InvalidRange {
        message: format!("{kind} ranges are invalid."),
    };

    let (start, end) = range.split_once(':').ok_or_else(invalid)?;
    let start: u64 = start.trim().parse().map_err(|_| invalid())?;
    let end: u64 = end.trim().parse().map_err(|_| invalid())?;

    if start > end {
        return Err(invalid());
    }
    Ok((start, end))
}

/// Check `"start:end"` VLAN ranges against 1..=4094.
pub fn validate_vlan_ranges<S: AsRef<str>>(ranges: &[S]) -> Result<(), ValidationError> {
    for range in ranges {
        let (start, end) = parse_range("vlan", range.as_ref())?;
        if start < VLAN_MIN || end > VLAN_MAX {
            return Err(ValidationError::InvalidRange {
                message: "vlan id are invalid.".to_string(),
            });
        }
    }
    Ok(())
}

/// Check `"start:end"` tunnel-id ranges against an upper bound.
///
/// `kind` selects the message family; `max` the inclusive bound
/// ([`GRE_MAX_TUNNEL_ID`] for GRE, [`VNI_MAX`] for VXLAN/Geneve VNIs).
pub fn validate_tunnel_id_ranges<S: AsRef<str>>(
    kind: &str,
    ranges: &[S],
    max: u64,
) -> Result<(), ValidationError> {
    for range in ranges {
        let (_, end) = parse_range(kind, range.as_ref())?;
        if end > max {
            return Err(ValidationError::InvalidRange {
                message: format!("{kind} ranges are to large."),
            });
        }
    }
    Ok(())
}

/// Check `"start:end"` VNI ranges against the 24-bit VNI space.
pub fn validate_vni_ranges<S: AsRef<str>>(ranges: &[S]) -> Result<(), ValidationError> {
    validate_tunnel_id_ranges("vni", ranges, VNI_MAX)
}

/// Whether `addr` is a multicast IPv4 address (224.0.0.0/4).
pub fn is_multicast_ipv4(addr: &str) -> bool {
    addr.parse::<Ipv4Addr>().is_ok_and(|ip| ip.is_multicast())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_range_accepts_well_formed() {
        assert_eq!(parse_range("vlan", "10:50").unwrap(), (10, 50));
        assert_eq!(parse_range("vlan", "7:7").unwrap(), (7, 7));
    }

    #[test]
    fn parse_range_rejects_inverted() {
        let err = parse_range("vlan", "2938:1").unwrap_err();
        assert_eq!(err.to_string(), "vlan ranges are invalid.");
    }

    #[test]
    fn parse_range_rejects_garbage() {
        for bad in ["", "10", "a:b", "10:", ":50", "1:2:3"] {
            assert!(parse_range("vni", bad).is_err(), "expected {bad:?} to fail");
        }
    }

    #[test]
    fn vlan_ranges_within_bounds() {
        assert!(validate_vlan_ranges(&["1:20", "400:4094"]).is_ok());
        assert!(validate_vlan_ranges(&["1:4094"]).is_ok());
        assert!(validate_vlan_ranges::<&str>(&[]).is_ok());
    }

    #[test]
    fn vlan_id_out_of_bounds_is_distinguishable() {
        let err = validate_vlan_ranges(&["1:20", "400:4099"]).unwrap_err();
        assert_eq!(err.to_string(), "vlan id are invalid.");

        let err = validate_vlan_ranges(&["0:20"]).unwrap_err();
        assert_eq!(err.to_string(), "vlan id are invalid.");

        // Malformed range, different message.
        let err = validate_vlan_ranges(&["2938:1"]).unwrap_err();
        assert_eq!(err.to_string(), "vlan ranges are invalid.");
    }

    #[test]
    fn tunnel_id_ranges_against_gre_bound() {
        assert!(validate_tunnel_id_ranges("tunnel id", &["0:20", "40:60"], GRE_MAX_TUNNEL_ID).is_ok());

        let err =
            validate_tunnel_id_ranges("tunnel id", &["40:10000000000"], GRE_MAX_TUNNEL_ID)
                .unwrap_err();
        assert_eq!(err.to_string(), "tunnel id ranges are to large.");

        let err = validate_tunnel_id_ranges("tunnel id", &["20:1"], GRE_MAX_TUNNEL_ID).unwrap_err();
        assert_eq!(err.to_string(), "tunnel id ranges are invalid.");
    }

    #[test]
    fn vni_ranges_against_24_bit_bound() {
        assert!(validate_vni_ranges(&["40:300", "500:1000"]).is_ok());
        assert!(validate_vni_ranges(&[format!("0:{VNI_MAX}")]).is_ok());

        let err = validate_vni_ranges(&["0:16777216"]).unwrap_err();
        assert_eq!(err.to_string(), "vni ranges are to large.");

        let err = validate_vni_ranges(&["2938:1"]).unwrap_err();
        assert_eq!(err.to_string(), "vni ranges are invalid.");
    }

    #[test]
    fn multicast_detection() {
        assert!(is_multicast_ipv4("224.0.0.1"));
        assert!(is_multicast_ipv4("224.1.1.1"));
        assert!(is_multicast_ipv4("239.255.255.255"));
        assert!(!is_multicast_ipv4("192.1.1.1"));
        assert!(!is_multicast_ipv4("223.255.255.255"));
        assert!(!is_multicast_ipv4("not-an-address"));
    }
}
