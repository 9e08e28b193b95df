//! Alert decision and alert payload construction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ContentSeverity;
use crate::event::ProcessedEvent;

/// Event-name fragments that always page, regardless of score
pub const CRITICAL_EVENT_MARKERS: &[&str] = &[
    "RootCredentialUsage",
    "UnauthorizedAPICall",
    "InstanceCredentialExfiltration",
];

const DEFAULT_RECOMMENDATIONS: &[&str] = &[
    "Review event details for context",
    "Check related events in timeframe",
    "Verify if activity was authorized",
];

const RECOMMENDATIONS_BY_KEYWORD: &[(&str, &[&str])] = &[
    (
        "credential",
        &[
            "Immediately rotate affected credentials",
            "Review IAM policies for excessive permissions",
            "Enable AWS CloudTrail for API monitoring",
        ],
    ),
    (
        "unauthorized",
        &[
            "Block source IP address if malicious",
            "Review network security groups",
            "Implement additional access controls",
        ],
    ),
    (
        "cryptocurrency",
        &[
            "Terminate affected instances immediately",
            "Scan for malware and backdoors",
            "Review instance launch permissions",
        ],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    High,
    Medium,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::High => write!(f, "HIGH"),
            AlertSeverity::Medium => write!(f, "MEDIUM"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: Uuid,
    pub event_type: String,
    pub risk_score: u8,
    pub source_ip: Option<String>,
    pub finding_type: Option<String>,
    pub account: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub alert_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub severity: AlertSeverity,
    pub event_summary: EventSummary,
    pub recommendations: Vec<String>,
    #[serde(skip)]
    pub subject: String,
}

/// Thresholds deciding when a processed event pages someone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    /// Minimum risk score that alerts on its own
    pub risk_threshold: u8,
    /// Minimum GuardDuty severity that alerts on its own
    pub severity_threshold: f64,
    /// Risk score from which an alert is HIGH rather than MEDIUM
    pub high_severity_score: u8,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            risk_threshold: 70,
            severity_threshold: 7.0,
            high_severity_score: 80,
        }
    }
}

impl AlertPolicy {
    pub fn should_alert(&self, event: &ProcessedEvent) -> bool {
        if event.risk_score >= self.risk_threshold {
            return true;
        }

        if event
            .details
            .severity()
            .is_some_and(|s| s >= self.severity_threshold)
        {
            return true;
        }

        if event.threat_intel.is_known_threat {
            return true;
        }

        if event.details.content_severity() == Some(ContentSeverity::High) {
            return true;
        }

        [event.details.finding_type(), event.details.event_name()]
            .into_iter()
            .flatten()
            .any(|name| CRITICAL_EVENT_MARKERS.iter().any(|m| name.contains(m)))
    }

    pub fn severity_for(&self, event: &ProcessedEvent) -> AlertSeverity {
        if event.risk_score >= self.high_severity_score {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        }
    }

    /// Build the alert document for an event that passed `should_alert`
    pub fn build_alert(&self, event: &ProcessedEvent, now: DateTime<Utc>) -> SecurityAlert {
        let finding_type = event.details.finding_type().map(str::to_string);
        let subject = format!(
            "Security Alert: {}",
            finding_type.as_deref().unwrap_or("Unknown Event")
        );

        SecurityAlert {
            alert_id: Uuid::new_v4(),
            timestamp: now,
            severity: self.severity_for(event),
            event_summary: EventSummary {
                event_id: event.event_id,
                event_type: event.details.event_type().to_string(),
                risk_score: event.risk_score,
                source_ip: event.details.source_ip().map(str::to_string),
                finding_type: finding_type.clone(),
                account: event.details.account().map(str::to_string),
                region: event.details.region().map(str::to_string),
            },
            recommendations: recommendations(finding_type.as_deref()),
            subject,
        }
    }
}

/// Response steps keyed by finding type keywords
pub fn recommendations(finding_type: Option<&str>) -> Vec<String> {
    let finding_type = finding_type.unwrap_or_default().to_lowercase();

    let mut steps: Vec<String> = RECOMMENDATIONS_BY_KEYWORD
        .iter()
        .filter(|(keyword, _)| finding_type.contains(keyword))
        .flat_map(|(_, steps)| steps.iter().map(|s| s.to_string()))
        .collect();

    if steps.is_empty() {
        steps = DEFAULT_RECOMMENDATIONS
            .iter()
            .map(|s| s.to_string())
            .collect();
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{Enricher, ThreatIntel};
    use crate::processor::EventProcessor;
    use serde_json::json;

    fn process(raw: serde_json::Value) -> ProcessedEvent {
        EventProcessor::new(Enricher::default()).process(raw).unwrap()
    }

    #[test]
    fn high_severity_finding_alerts() {
        let event = process(json!({
            "detail": { "type": "Recon:EC2/Portscan", "severity": 7.5, "createdAt": "2024-01-15T12:00:00Z" }
        }));
        assert!(event.risk_score < 70);
        assert!(AlertPolicy::default().should_alert(&event));
    }

    #[test]
    fn quiet_cloudtrail_call_does_not_alert() {
        let event = process(json!({
            "Records": [{
                "eventName": "ListBuckets",
                "sourceIPAddress": "203.0.113.12",
                "eventTime": "2024-01-15T12:00:00Z"
            }]
        }));
        assert!(!AlertPolicy::default().should_alert(&event));
    }

    #[test]
    fn blocklisted_source_alerts() {
        let mut event = process(json!({
            "Records": [{
                "eventName": "ListBuckets",
                "sourceIPAddress": "192.168.1.100",
                "eventTime": "2024-01-15T12:00:00Z"
            }]
        }));
        assert!(event.threat_intel.is_known_threat);
        assert!(AlertPolicy::default().should_alert(&event));

        event.threat_intel = ThreatIntel::default();
        event.risk_score = 0;
        assert!(!AlertPolicy::default().should_alert(&event));
    }

    #[test]
    fn critical_event_name_alerts_even_at_low_score() {
        let event = process(json!({
            "Records": [{
                "eventName": "RootCredentialUsage",
                "sourceIPAddress": "203.0.113.12",
                "eventTime": "2024-01-15T12:00:00Z"
            }]
        }));
        assert_eq!(event.risk_score, 0);
        assert!(AlertPolicy::default().should_alert(&event));
    }

    #[test]
    fn alert_severity_and_subject() {
        let event = process(json!({
            "detail": {
                "id": "f-9",
                "type": "CryptoCurrency:EC2/BitcoinTool.B!DNS",
                "severity": 8.0,
                "accountId": "643275918916",
                "region": "eu-west-1",
                "createdAt": "2024-01-15T12:00:00Z"
            }
        }));
        let policy = AlertPolicy::default();
        let alert = policy.build_alert(&event, Utc::now());

        assert_eq!(event.risk_score, 80);
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(
            alert.subject,
            "Security Alert: CryptoCurrency:EC2/BitcoinTool.B!DNS"
        );
        assert_eq!(alert.event_summary.account.as_deref(), Some("643275918916"));
        assert_eq!(alert.event_summary.region.as_deref(), Some("eu-west-1"));
        assert_eq!(alert.recommendations[0], "Terminate affected instances immediately");

        let doc = serde_json::to_value(&alert).unwrap();
        assert_eq!(doc["severity"], "HIGH");
        assert!(doc.get("subject").is_none());
    }

    #[test]
    fn subject_falls_back_for_non_findings() {
        let event = process(json!({ "source": "aws.signin" }));
        let alert = AlertPolicy::default().build_alert(&event, Utc::now());
        assert_eq!(alert.subject, "Security Alert: Unknown Event");
        assert_eq!(alert.severity, AlertSeverity::Medium);
    }

    #[test]
    fn recommendations_accumulate_by_keyword() {
        let steps = recommendations(Some("UnauthorizedAccess:IAMUser/InstanceCredentialExfiltration"));
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0], "Immediately rotate affected credentials");
        assert_eq!(steps[3], "Block source IP address if malicious");

        let defaults = recommendations(None);
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults[0], "Review event details for context");
    }
}
