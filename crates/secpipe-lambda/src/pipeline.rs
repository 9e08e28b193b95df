// Per-batch record processing
//
// Records are handled in order; a failing record is logged and counted and
// the batch carries on. Only a panic or an initialisation error fails the
// invocation.

use anyhow::Result;
use aws_lambda_events::event::kinesis::KinesisEventRecord;
use chrono::Utc;
use secpipe_core::{AlertPolicy, EventProcessor, ProcessingStats};
use secpipe_writer::EventWriter;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::alerts::AlertSink;

/// Stream record reduced to what processing needs
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub event_id: Option<String>,
    pub data: Vec<u8>,
}

impl From<KinesisEventRecord> for InboundRecord {
    fn from(record: KinesisEventRecord) -> Self {
        Self {
            event_id: record.event_id,
            data: record.kinesis.data.0,
        }
    }
}

pub struct Pipeline {
    processor: EventProcessor,
    policy: AlertPolicy,
    writer: EventWriter,
    alerts: Arc<dyn AlertSink>,
}

impl Pipeline {
    pub fn new(
        processor: EventProcessor,
        policy: AlertPolicy,
        writer: EventWriter,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            processor,
            policy,
            writer,
            alerts,
        }
    }

    pub async fn process_records(&self, records: Vec<InboundRecord>) -> ProcessingStats {
        info!("Processing {} records", records.len());

        let mut stats = ProcessingStats::default();
        for record in &records {
            match self.process_record(record).await {
                Ok(alerted) => {
                    stats.processed_records += 1;
                    if alerted {
                        stats.alerts_generated += 1;
                    }
                }
                Err(e) => {
                    error!(
                        record_id = record.event_id.as_deref().unwrap_or("unknown"),
                        "Failed to process record: {:#}", e
                    );
                    stats.failed_records += 1;
                }
            }
        }

        info!(
            processed = stats.processed_records,
            failed = stats.failed_records,
            alerts = stats.alerts_generated,
            "{}",
            stats.completion_message()
        );
        stats
    }

    /// Returns whether an alert was raised for the record
    async fn process_record(&self, record: &InboundRecord) -> Result<bool> {
        let event = self.processor.process_payload(&record.data)?;
        self.writer.write(&event).await?;

        if !self.policy.should_alert(&event) {
            return Ok(false);
        }

        let alert = self.policy.build_alert(&event, Utc::now());
        // Delivery problems must not lose the stored event
        if let Err(e) = self.alerts.publish(&alert).await {
            error!(event_id = %event.event_id, "Failed to send alert: {:#}", e);
        }
        Ok(true)
    }
}

/// Invocation result returned to the Lambda runtime
#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

#[derive(Serialize)]
struct BatchBody {
    #[serde(flatten)]
    stats: ProcessingStats,
    remaining_time_ms: u64,
}

impl BatchResponse {
    pub fn ok(stats: ProcessingStats, remaining_time_ms: u64) -> Self {
        let body = BatchBody {
            stats,
            remaining_time_ms,
        };
        Self {
            status_code: 200,
            body: serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}
