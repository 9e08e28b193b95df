// Hive-style partition keys for the data lake
//
// Keys look like `security-events/year=2024/month=01/day=15/hour=14/<id>.json`.
// The date comes from the event time when it parses, otherwise from the
// processing time.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};

use crate::event::ProcessedEvent;

pub const DATA_LAKE_PREFIX: &str = "security-events";

/// Generate the object key for a processed event
pub fn partition_key(event: &ProcessedEvent, prefix: Option<&str>) -> String {
    let timestamp = event
        .details
        .event_time()
        .and_then(parse_event_time)
        .unwrap_or(event.processed_at);

    let key = format!(
        "{}/year={:04}/month={:02}/day={:02}/hour={:02}/{}.json",
        DATA_LAKE_PREFIX,
        timestamp.year(),
        timestamp.month(),
        timestamp.day(),
        timestamp.hour(),
        event.event_id
    );

    match prefix.map(|p| p.trim_end_matches('/')) {
        Some(p) if !p.is_empty() => format!("{p}/{key}"),
        _ => key,
    }
}

/// RFC 3339 with offset or `Z`; a bare timestamp is taken as UTC
fn parse_event_time(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::ThreatIntel;
    use crate::event::{AwsEventFields, EventDetails};
    use serde_json::json;
    use uuid::Uuid;

    fn event(event_time: &str) -> ProcessedEvent {
        ProcessedEvent {
            event_id: Uuid::parse_str("6f1c2a9e-8d4b-4e57-9a1f-0c3b2d4e5f60").unwrap(),
            processed_at: DateTime::parse_from_rfc3339("2024-03-02T07:45:00Z")
                .unwrap()
                .with_timezone(&Utc),
            details: EventDetails::AwsEvent(AwsEventFields {
                source: "aws.signin".into(),
                detail_type: "AWS Console Sign In via CloudTrail".into(),
                account: "123456789012".into(),
                region: "us-east-1".into(),
                event_time: event_time.into(),
                resources: vec![],
            }),
            risk_score: 0,
            geo_info: None,
            threat_intel: ThreatIntel::default(),
            raw_event: json!({}),
        }
    }

    #[test]
    fn key_uses_event_time() {
        let key = partition_key(&event("2024-01-15T14:30:00Z"), None);
        assert_eq!(
            key,
            "security-events/year=2024/month=01/day=15/hour=14/6f1c2a9e-8d4b-4e57-9a1f-0c3b2d4e5f60.json"
        );
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let key = partition_key(&event("2024-01-15T23:30:00-02:00"), None);
        assert!(key.starts_with("security-events/year=2024/month=01/day=16/hour=01/"));
    }

    #[test]
    fn naive_timestamps_are_utc() {
        let key = partition_key(&event("2024-06-09T04:05:06.789"), None);
        assert!(key.starts_with("security-events/year=2024/month=06/day=09/hour=04/"));
    }

    #[test]
    fn unparsable_time_falls_back_to_processing_time() {
        let key = partition_key(&event("yesterday"), None);
        assert!(key.starts_with("security-events/year=2024/month=03/day=02/hour=07/"));
    }

    #[test]
    fn prefix_is_joined_with_single_slash() {
        let e = event("2024-01-15T14:30:00Z");
        assert!(partition_key(&e, Some("lake/")).starts_with("lake/security-events/year=2024/"));
        assert!(partition_key(&e, Some("lake")).starts_with("lake/security-events/"));
        assert!(partition_key(&e, Some("")).starts_with("security-events/"));
    }
}
