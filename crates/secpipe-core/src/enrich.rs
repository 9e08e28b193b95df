// Geo and threat-intelligence enrichment
//
// Lookups are table driven: an IP blocklist, a static IP -> country table and
// a list of high-risk countries. Tables come from configuration so they can be
// refreshed without a rebuild.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use crate::error::{ProcessError, Result};

pub const DEFAULT_BLOCKLIST: &[&str] = &["192.168.1.100", "10.0.0.50"];
pub const DEFAULT_HIGH_RISK_COUNTRIES: &[&str] = &["CN", "RU", "KP"];

const BLOCKLIST_SOURCE: &str = "internal_blocklist";
const BLOCKLIST_CONFIDENCE: u8 = 85;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub is_private: bool,
    pub is_malicious: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatIntel {
    pub is_known_threat: bool,
    #[serde(default)]
    pub threat_type: Option<String>,
    pub confidence: u8,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Enricher {
    blocklist: HashSet<IpAddr>,
    countries: HashMap<IpAddr, String>,
    high_risk_countries: HashSet<String>,
}

impl Default for Enricher {
    fn default() -> Self {
        Self {
            blocklist: DEFAULT_BLOCKLIST
                .iter()
                .filter_map(|ip| ip.parse().ok())
                .collect(),
            countries: HashMap::new(),
            high_risk_countries: DEFAULT_HIGH_RISK_COUNTRIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl Enricher {
    /// Build an enricher from textual tables, rejecting unparsable addresses
    pub fn from_tables<'a>(
        blocklist: impl IntoIterator<Item = &'a str>,
        high_risk_countries: impl IntoIterator<Item = &'a str>,
        countries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let blocklist = blocklist
            .into_iter()
            .map(parse_ip)
            .collect::<Result<HashSet<_>>>()?;

        let countries = countries
            .into_iter()
            .map(|(ip, country)| Ok((parse_ip(ip)?, country.to_ascii_uppercase())))
            .collect::<Result<HashMap<_, _>>>()?;

        let high_risk_countries = high_risk_countries
            .into_iter()
            .map(|c| c.to_ascii_uppercase())
            .collect();

        Ok(Self {
            blocklist,
            countries,
            high_risk_countries,
        })
    }

    /// Geolocate a source address
    ///
    /// Returns `None` for placeholders (`unknown`, `localhost`), unparsable
    /// text and loopback addresses.
    pub fn geolocate(&self, ip: &str) -> Option<GeoInfo> {
        let addr = lookup_address(ip)?;
        if addr.is_loopback() {
            return None;
        }

        Some(GeoInfo {
            ip: addr.to_string(),
            country: self.countries.get(&addr).cloned(),
            is_private: is_private(&addr),
            is_malicious: self.blocklist.contains(&addr),
        })
    }

    /// Check a source address against the threat feeds
    pub fn threat_intel(&self, ip: Option<&str>) -> ThreatIntel {
        match ip.and_then(lookup_address) {
            Some(addr) if self.blocklist.contains(&addr) => ThreatIntel {
                is_known_threat: true,
                threat_type: Some("malicious_ip".to_string()),
                confidence: BLOCKLIST_CONFIDENCE,
                sources: vec![BLOCKLIST_SOURCE.to_string()],
            },
            _ => ThreatIntel::default(),
        }
    }

    pub fn is_high_risk_country(&self, country: &str) -> bool {
        self.high_risk_countries
            .contains(&country.to_ascii_uppercase())
    }
}

fn parse_ip(text: &str) -> Result<IpAddr> {
    text.trim()
        .parse()
        .map_err(|_| ProcessError::InvalidAddress(text.to_string()))
}

fn lookup_address(ip: &str) -> Option<IpAddr> {
    let ip = ip.trim();
    if ip.is_empty() || ip.eq_ignore_ascii_case("unknown") || ip.eq_ignore_ascii_case("localhost")
    {
        return None;
    }
    ip.parse().ok()
}

fn is_private(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => (v6.segments()[0] & 0xfe00) == 0xfc00,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklisted_address_is_known_threat() {
        let enricher = Enricher::default();
        let intel = enricher.threat_intel(Some("192.168.1.100"));
        assert!(intel.is_known_threat);
        assert_eq!(intel.threat_type.as_deref(), Some("malicious_ip"));
        assert_eq!(intel.confidence, 85);
        assert_eq!(intel.sources, vec!["internal_blocklist".to_string()]);

        let clean = enricher.threat_intel(Some("203.0.113.12"));
        assert_eq!(clean, ThreatIntel::default());
        assert_eq!(enricher.threat_intel(None), ThreatIntel::default());
    }

    #[test]
    fn placeholders_and_loopback_are_not_geolocated() {
        let enricher = Enricher::default();
        assert!(enricher.geolocate("unknown").is_none());
        assert!(enricher.geolocate("localhost").is_none());
        assert!(enricher.geolocate("").is_none());
        assert!(enricher.geolocate("127.0.0.1").is_none());
        assert!(enricher.geolocate("::1").is_none());
        assert!(enricher.geolocate("not-an-ip").is_none());
    }

    #[test]
    fn geolocation_uses_country_table() {
        let enricher = Enricher::from_tables(
            ["10.0.0.50"],
            ["ru"],
            [("198.51.100.7", "ru"), ("203.0.113.12", "US")],
        )
        .unwrap();

        let geo = enricher.geolocate("198.51.100.7").unwrap();
        assert_eq!(geo.country.as_deref(), Some("RU"));
        assert!(!geo.is_private);
        assert!(!geo.is_malicious);
        assert!(enricher.is_high_risk_country("RU"));
        assert!(!enricher.is_high_risk_country("US"));

        let internal = enricher.geolocate("10.0.0.50").unwrap();
        assert!(internal.is_private);
        assert!(internal.is_malicious);
        assert!(internal.country.is_none());
    }

    #[test]
    fn invalid_table_entries_are_rejected() {
        let err = Enricher::from_tables(["300.1.1.1"], [], []).unwrap_err();
        assert!(matches!(err, ProcessError::InvalidAddress(ip) if ip == "300.1.1.1"));
    }
}
