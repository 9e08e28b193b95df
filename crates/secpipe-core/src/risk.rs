// Risk scoring
//
// Additive 0-100 score. Enrichment runs before scoring so that geo reputation
// contributes to the result.

use chrono::{DateTime, Timelike, Utc};

use crate::enrich::{Enricher, GeoInfo};
use crate::event::EventDetails;

/// Event-name fragments that indicate an attack technique
pub const HIGH_RISK_EVENT_MARKERS: &[&str] = &[
    "UnauthorizedAPICall",
    "InstanceCredentialExfiltration",
    "CryptoCurrency",
    "Stealth",
    "Backdoor",
];

pub const MAX_SCORE: u8 = 100;

const MAX_SEVERITY_POINTS: f64 = 50.0;
const HIGH_RISK_EVENT_POINTS: u32 = 30;
const MALICIOUS_IP_POINTS: u32 = 25;
const HIGH_RISK_COUNTRY_POINTS: u32 = 10;
const AFTER_HOURS_POINTS: u32 = 5;
const FAILED_CALL_POINTS: u32 = 10;

/// Score an event from its fields and enrichment results
pub fn risk_score(details: &EventDetails, geo: Option<&GeoInfo>, enricher: &Enricher) -> u8 {
    let mut score: u32 = match details {
        EventDetails::GenericEvent(fields) => u32::from(fields.threat_analysis.risk_score),
        _ => 0,
    };

    if let Some(severity) = details.severity() {
        score += (severity * 10.0).clamp(0.0, MAX_SEVERITY_POINTS) as u32;
    }

    let name = details.finding_type().or_else(|| details.event_name());
    if name.is_some_and(is_high_risk_event) {
        score += HIGH_RISK_EVENT_POINTS;
    }

    if let Some(geo) = geo {
        if geo.is_malicious {
            score += MALICIOUS_IP_POINTS;
        }
        if geo
            .country
            .as_deref()
            .is_some_and(|c| enricher.is_high_risk_country(c))
        {
            score += HIGH_RISK_COUNTRY_POINTS;
        }
    }

    if details.event_time().is_some_and(is_after_hours) {
        score += AFTER_HOURS_POINTS;
    }

    if details.has_error() {
        score += FAILED_CALL_POINTS;
    }

    score.min(u32::from(MAX_SCORE)) as u8
}

fn is_high_risk_event(name: &str) -> bool {
    let name = name.to_lowercase();
    HIGH_RISK_EVENT_MARKERS
        .iter()
        .any(|marker| name.contains(&marker.to_lowercase()))
}

/// Activity before 06:00 or after 22:59 UTC
fn is_after_hours(event_time: &str) -> bool {
    match DateTime::parse_from_rfc3339(event_time) {
        Ok(ts) => {
            let hour = ts.with_timezone(&Utc).hour();
            !(6..=22).contains(&hour)
        }
        Err(_) => false,
    }
}
