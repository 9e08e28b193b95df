//! Processed security event model
//!
//! A processed event keeps the raw payload alongside the fields extracted for
//! its source family. The source-specific fields are flattened into the
//! top-level document and discriminated by `event_type`, so the JSON written
//! to the data lake stays queryable with a single Glue/Athena schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::content::{ContentClassification, ContentSeverity};
use crate::enrich::{GeoInfo, ThreatIntel};

/// Placeholder for fields the source did not provide
pub const UNKNOWN: &str = "unknown";

/// Generic EventBridge-style AWS event (`source`, `detail-type`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsEventFields {
    pub source: String,
    pub detail_type: String,
    pub account: String,
    pub region: String,
    pub event_time: String,
    #[serde(default)]
    pub resources: Vec<Value>,
}

/// GuardDuty finding delivered through EventBridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardDutyFields {
    pub finding_id: String,
    pub finding_type: String,
    pub severity: f64,
    pub confidence: f64,
    pub account: String,
    pub region: String,
    pub event_time: String,
    pub resource_type: String,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub user_identity: Value,
    #[serde(default)]
    pub action: Value,
    pub count: u64,
}

/// CloudTrail API call (first entry of a `Records` envelope)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudTrailFields {
    pub event_name: String,
    pub event_source: String,
    pub source_ip: String,
    pub user_agent: String,
    #[serde(default)]
    pub user_identity: Value,
    pub event_time: String,
    pub aws_region: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub read_only: bool,
    #[serde(default)]
    pub resources: Vec<Value>,
}

/// Flat application security event, classified by content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericFields {
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub threat_analysis: ContentClassification,
}

/// Source-specific fields, tagged by `event_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventDetails {
    #[serde(rename = "aws_event")]
    AwsEvent(AwsEventFields),
    #[serde(rename = "guardduty_finding")]
    GuardDutyFinding(GuardDutyFields),
    #[serde(rename = "cloudtrail_event")]
    CloudTrailEvent(CloudTrailFields),
    #[serde(rename = "generic_event")]
    GenericEvent(GenericFields),
}

impl EventDetails {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AwsEvent(_) => "aws_event",
            Self::GuardDutyFinding(_) => "guardduty_finding",
            Self::CloudTrailEvent(_) => "cloudtrail_event",
            Self::GenericEvent(_) => "generic_event",
        }
    }

    /// Event time as reported by the source (RFC 3339 where the source is AWS)
    pub fn event_time(&self) -> Option<&str> {
        match self {
            Self::AwsEvent(f) => Some(&f.event_time),
            Self::GuardDutyFinding(f) => Some(&f.event_time),
            Self::CloudTrailEvent(f) => Some(&f.event_time),
            Self::GenericEvent(f) => f.event_time.as_deref(),
        }
    }

    /// Source address, when the source family carries one
    pub fn source_ip(&self) -> Option<&str> {
        match self {
            Self::AwsEvent(_) => None,
            Self::GuardDutyFinding(f) => f.source_ip.as_deref(),
            Self::CloudTrailEvent(f) => Some(&f.source_ip),
            Self::GenericEvent(f) => f.source_ip.as_deref(),
        }
    }

    /// GuardDuty severity (0.0 - 10.0)
    pub fn severity(&self) -> Option<f64> {
        match self {
            Self::GuardDutyFinding(f) => Some(f.severity),
            _ => None,
        }
    }

    pub fn finding_type(&self) -> Option<&str> {
        match self {
            Self::GuardDutyFinding(f) => Some(&f.finding_type),
            _ => None,
        }
    }

    pub fn event_name(&self) -> Option<&str> {
        match self {
            Self::CloudTrailEvent(f) => Some(&f.event_name),
            _ => None,
        }
    }

    pub fn account(&self) -> Option<&str> {
        match self {
            Self::AwsEvent(f) => Some(&f.account),
            Self::GuardDutyFinding(f) => Some(&f.account),
            Self::CloudTrailEvent(f) => f.user_identity.get("accountId").and_then(Value::as_str),
            Self::GenericEvent(_) => None,
        }
    }

    pub fn region(&self) -> Option<&str> {
        match self {
            Self::AwsEvent(f) => Some(&f.region),
            Self::GuardDutyFinding(f) => Some(&f.region),
            Self::CloudTrailEvent(f) => Some(&f.aws_region),
            Self::GenericEvent(_) => None,
        }
    }

    /// True when the source reported a failed call
    pub fn has_error(&self) -> bool {
        match self {
            Self::CloudTrailEvent(f) => f.error_code.is_some() || f.error_message.is_some(),
            _ => false,
        }
    }

    /// Content severity for events classified by pattern matching
    pub fn content_severity(&self) -> Option<ContentSeverity> {
        match self {
            Self::GenericEvent(f) => Some(f.threat_analysis.severity),
            _ => None,
        }
    }
}

/// A decoded, classified, enriched and scored security event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub event_id: Uuid,
    pub processed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: EventDetails,
    pub risk_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_info: Option<GeoInfo>,
    #[serde(default)]
    pub threat_intel: ThreatIntel,
    pub raw_event: Value,
}

/// Per-batch outcome reported by the stream consumer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub processed_records: usize,
    pub failed_records: usize,
    pub alerts_generated: usize,
}

impl ProcessingStats {
    pub fn total(&self) -> usize {
        self.processed_records + self.failed_records
    }

    /// Log line the validation harness searches for
    pub fn completion_message(&self) -> String {
        format!(
            "Processing complete: {} successful, {} failed, {} alerts",
            self.processed_records, self.failed_records, self.alerts_generated
        )
    }
}
