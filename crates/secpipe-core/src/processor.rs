//! Event processing pipeline
//!
//! decode → classify → enrich → score. Alerting and persistence are left to
//! the caller so the same processor serves the Lambda handler and the
//! offline `process` command.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::classify::classify;
use crate::enrich::Enricher;
use crate::error::Result;
use crate::event::ProcessedEvent;
use crate::record::decode_payload;
use crate::risk::risk_score;

#[derive(Debug, Clone, Default)]
pub struct EventProcessor {
    enricher: Enricher,
}

impl EventProcessor {
    pub fn new(enricher: Enricher) -> Self {
        Self { enricher }
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    /// Process a raw event using the current time
    pub fn process(&self, raw: Value) -> Result<ProcessedEvent> {
        self.process_at(raw, Utc::now())
    }

    /// Process a raw event as if it arrived at `now`
    pub fn process_at(&self, raw: Value, now: DateTime<Utc>) -> Result<ProcessedEvent> {
        let details = classify(&raw, now)?;

        let source_ip = details.source_ip();
        let geo_info = source_ip.and_then(|ip| self.enricher.geolocate(ip));
        let threat_intel = self.enricher.threat_intel(source_ip);
        let risk_score = risk_score(&details, geo_info.as_ref(), &self.enricher);

        debug!(
            event_type = details.event_type(),
            risk_score,
            known_threat = threat_intel.is_known_threat,
            "Processed security event"
        );

        Ok(ProcessedEvent {
            event_id: Uuid::new_v4(),
            processed_at: now,
            details,
            risk_score,
            geo_info,
            threat_intel,
            raw_event: raw,
        })
    }

    /// Decode record bytes and process the result
    pub fn process_payload(&self, bytes: &[u8]) -> Result<ProcessedEvent> {
        let raw = decode_payload(bytes)?;
        self.process(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessError;
    use serde_json::json;

    #[test]
    fn enrichment_feeds_the_score() {
        let enricher =
            Enricher::from_tables(["198.51.100.7"], ["RU"], [("198.51.100.7", "RU")]).unwrap();
        let processor = EventProcessor::new(enricher);
        let now = Utc::now();

        let event = processor
            .process_at(
                json!({
                    "Records": [{
                        "eventName": "ConsoleLogin",
                        "sourceIPAddress": "198.51.100.7",
                        "eventTime": "2024-01-15T12:00:00Z"
                    }]
                }),
                now,
            )
            .unwrap();

        let geo = event.geo_info.as_ref().unwrap();
        assert!(geo.is_malicious);
        assert_eq!(geo.country.as_deref(), Some("RU"));
        assert!(event.threat_intel.is_known_threat);
        assert_eq!(event.risk_score, 35);
        assert_eq!(event.processed_at, now);
        assert_eq!(event.raw_event["Records"][0]["eventName"], "ConsoleLogin");
    }

    #[test]
    fn events_without_address_skip_enrichment() {
        let event = EventProcessor::default()
            .process(json!({ "source": "aws.signin" }))
            .unwrap();
        assert!(event.geo_info.is_none());
        assert!(!event.threat_intel.is_known_threat);
    }

    #[test]
    fn each_event_gets_a_fresh_id() {
        let processor = EventProcessor::default();
        let a = processor.process(json!({ "source": "a" })).unwrap();
        let b = processor.process(json!({ "source": "a" })).unwrap();
        assert_ne!(a.event_id, b.event_id);
        assert_eq!(a.event_id.get_version_num(), 4);
    }

    #[test]
    fn payload_errors_propagate() {
        let err = EventProcessor::default()
            .process_payload(b"\"just a string\"")
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotAnObject("string")));
    }
}
