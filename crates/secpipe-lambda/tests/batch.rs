use anyhow::{bail, Result};
use async_trait::async_trait;
use aws_lambda_events::event::kinesis::KinesisEvent;
use base64::Engine;
use opendal::{services, Operator};
use secpipe_core::{validation_events, AlertPolicy, EventProcessor, SecurityAlert};
use secpipe_lambda::{AlertSink, BatchResponse, InboundRecord, Pipeline};
use secpipe_writer::EventWriter;
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    alerts: Mutex<Vec<SecurityAlert>>,
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn publish(&self, alert: &SecurityAlert) -> Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl AlertSink for FailingSink {
    async fn publish(&self, _alert: &SecurityAlert) -> Result<()> {
        bail!("topic does not exist")
    }
}

fn pipeline(sink: Arc<dyn AlertSink>) -> (Pipeline, Operator) {
    let operator = Operator::new(services::Memory::default()).unwrap().finish();
    let writer = EventWriter::new(operator.clone(), None);
    let pipeline = Pipeline::new(
        EventProcessor::default(),
        AlertPolicy::default(),
        writer,
        sink,
    );
    (pipeline, operator)
}

fn record(data: Vec<u8>) -> InboundRecord {
    InboundRecord {
        event_id: Some("shardId-000000000000:1".to_string()),
        data,
    }
}

async fn stored_objects(operator: &Operator) -> usize {
    operator
        .list_with("security-events/")
        .recursive(true)
        .await
        .unwrap()
        .iter()
        .filter(|entry| entry.metadata().is_file())
        .count()
}

#[tokio::test]
async fn bad_records_are_counted_and_skipped() {
    let sink = Arc::new(RecordingSink::default());
    let (pipeline, operator) = pipeline(sink.clone());

    let mut records: Vec<InboundRecord> = validation_events()
        .into_iter()
        .map(|sample| record(serde_json::to_vec(&sample.payload).unwrap()))
        .collect();
    records.insert(1, record(b"{not json".to_vec()));

    let stats = pipeline.process_records(records).await;

    assert_eq!(stats.processed_records, 3);
    assert_eq!(stats.failed_records, 1);
    assert_eq!(stats.alerts_generated, 2);
    assert_eq!(
        stats.completion_message(),
        "Processing complete: 3 successful, 1 failed, 2 alerts"
    );

    let alerts = sink.alerts.lock().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(
        alerts[1].subject,
        "Security Alert: UnauthorizedAPICall:EC2/MaliciousIPCaller.Custom"
    );
    drop(alerts);

    assert_eq!(stored_objects(&operator).await, 3);
}

#[tokio::test]
async fn alert_delivery_failure_does_not_fail_the_record() {
    let (pipeline, operator) = pipeline(Arc::new(FailingSink));
    let finding = validation_events().remove(1);

    let stats = pipeline
        .process_records(vec![record(serde_json::to_vec(&finding.payload).unwrap())])
        .await;

    assert_eq!(stats.processed_records, 1);
    assert_eq!(stats.failed_records, 0);
    assert_eq!(stats.alerts_generated, 1);
    assert_eq!(stored_objects(&operator).await, 1);
}

#[tokio::test]
async fn empty_batch_reports_zeroes() {
    let (pipeline, _) = pipeline(Arc::new(RecordingSink::default()));
    let stats = pipeline.process_records(Vec::new()).await;
    assert_eq!(stats.total(), 0);

    let response = BatchResponse::ok(stats, 1500);
    assert_eq!(response.status_code, 200);
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["processed_records"], 0);
    assert_eq!(body["remaining_time_ms"], 1500);

    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire["statusCode"], 200);
}

#[test]
fn kinesis_records_are_base64_decoded() {
    let payload = json!({ "source": "aws.signin" }).to_string();
    let encoded = base64::engine::general_purpose::STANDARD.encode(payload.as_bytes());

    let event: KinesisEvent = serde_json::from_value(json!({
        "Records": [{
            "kinesis": {
                "kinesisSchemaVersion": "1.0",
                "partitionKey": "6f1c2a9e-8d4b-4e57-9a1f-0c3b2d4e5f60",
                "sequenceNumber": "49590338271490256608559692538361571095921575989136588898",
                "data": encoded,
                "approximateArrivalTimestamp": 1545084650.987,
                "encryptionType": "NONE"
            },
            "eventSource": "aws:kinesis",
            "eventVersion": "1.0",
            "eventID": "shardId-000000000006:49590338271490256608559692538361571095921575989136588898",
            "eventName": "aws:kinesis:record",
            "invokeIdentityArn": "arn:aws:iam::123456789012:role/lambda-role",
            "awsRegion": "us-east-1",
            "eventSourceARN": "arn:aws:kinesis:us-east-1:123456789012:stream/security-events"
        }]
    }))
    .unwrap();

    let records: Vec<InboundRecord> = event.records.into_iter().map(InboundRecord::from).collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].data, payload.as_bytes());
    assert!(records[0]
        .event_id
        .as_deref()
        .is_some_and(|id| id.starts_with("shardId-000000000006")));
}
