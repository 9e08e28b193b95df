// Content-based threat classification
//
// Flat application events (no AWS envelope) carry no structured severity, so
// they are scored by matching the serialized event text against known threat
// phrases. One match per category is enough; categories, not phrases, count.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    FailedLogin,
    Malware,
    NetworkAnomaly,
    PrivilegeEscalation,
    DataExfiltration,
}

const THREAT_PATTERNS: &[(ThreatCategory, &[&str])] = &[
    (
        ThreatCategory::FailedLogin,
        &["authentication failed", "login failed", "invalid credentials"],
    ),
    (
        ThreatCategory::Malware,
        &["virus detected", "trojan", "malware", "suspicious file"],
    ),
    (
        ThreatCategory::NetworkAnomaly,
        &["port scan", "ddos", "unusual traffic", "network intrusion"],
    ),
    (
        ThreatCategory::PrivilegeEscalation,
        &["admin access", "privilege escalation", "unauthorized access"],
    ),
    (
        ThreatCategory::DataExfiltration,
        &["large download", "data export", "file transfer", "sensitive data"],
    ),
];

const POINTS_PER_CATEGORY: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentClassification {
    pub threats_detected: Vec<ThreatCategory>,
    pub severity: ContentSeverity,
    pub risk_score: u8,
}

/// Classify an event by the threat phrases its text contains
pub fn classify_content(event: &Value) -> ContentClassification {
    let text = event.to_string().to_lowercase();

    let threats_detected: Vec<ThreatCategory> = THREAT_PATTERNS
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|phrase| text.contains(phrase)))
        .map(|(category, _)| *category)
        .collect();

    let severity = match threats_detected.len() {
        0 => ContentSeverity::Low,
        1 => ContentSeverity::Medium,
        _ => ContentSeverity::High,
    };

    let risk_score = (threats_detected.len() * POINTS_PER_CATEGORY).min(100) as u8;

    ContentClassification {
        threats_detected,
        severity,
        risk_score,
    }
}
