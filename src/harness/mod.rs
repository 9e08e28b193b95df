//! End-to-end validation of a deployed pipeline
//!
//! The harness checks that the stream, function and bucket are ready, puts the
//! three validation payloads on the stream, waits for the function to drain
//! them and then looks for evidence in the function's logs and the data lake.
//!
//! Every cloud call goes through [`PipelineProbe`] so the sequencing can be
//! exercised against an in-process fake. Runs are strictly sequential with
//! fixed sleeps: no retries, no backoff.

mod aws;
pub mod report;

pub use aws::AwsProbe;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secpipe_config::HarnessConfig;
use secpipe_core::{validation_events, SampleEvent};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use report::Report;

/// Expected Kinesis stream status
pub const STREAM_ACTIVE: &str = "ACTIVE";
/// Expected Lambda function state
pub const FUNCTION_ACTIVE: &str = "Active";

const LOG_SAMPLES: usize = 3;
const OBJECT_SAMPLES: usize = 5;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Infrastructure verification failed: {0}")]
    HealthCheckFailed(String),

    #[error("{operation} failed: {message}")]
    Cloud {
        operation: &'static str,
        message: String,
    },
}

impl HarnessError {
    pub fn cloud(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Cloud {
            operation,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Cloud operations the harness depends on
#[async_trait]
pub trait PipelineProbe: Send + Sync {
    /// Current status of the stream, e.g. `ACTIVE`
    async fn stream_status(&self) -> Result<String>;

    /// Current state of the function, e.g. `Active`
    async fn function_state(&self) -> Result<String>;

    /// Fails when the bucket is missing or not reachable
    async fn bucket_exists(&self) -> Result<()>;

    /// Put one record, returning its sequence number
    async fn put_record(&self, data: Vec<u8>, partition_key: &str) -> Result<String>;

    /// Log messages containing `marker` written since `since`
    async fn filter_log_events(&self, marker: &str, since: DateTime<Utc>) -> Result<Vec<String>>;

    /// Up to `max` object keys under `prefix`
    async fn list_objects(&self, prefix: &str, max: i32) -> Result<Vec<String>>;
}

/// Timings and lookup parameters for one run
#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    pub send_delay: Duration,
    pub processing_wait: Duration,
    pub log_marker: String,
    pub object_prefix: String,
    pub max_objects: i32,
}

impl From<&HarnessConfig> for ValidatorSettings {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            send_delay: config.send_delay(),
            processing_wait: config.processing_wait(),
            log_marker: config.log_marker.clone(),
            object_prefix: config.object_prefix.clone(),
            max_objects: config.max_objects,
        }
    }
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self::from(&HarnessConfig::default())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub events_sent: usize,
    pub events_total: usize,
    pub log_matches: usize,
    pub log_samples: Vec<String>,
    pub objects_found: usize,
    pub object_samples: Vec<String>,
}

impl ValidationReport {
    /// At least one event went out and the function logged a completed batch.
    /// The object count is informational only.
    pub fn success(&self) -> bool {
        self.events_sent > 0 && self.log_matches > 0
    }
}

pub struct Validator<P> {
    probe: P,
    settings: ValidatorSettings,
    report: Report,
}

impl<P: PipelineProbe> Validator<P> {
    pub fn new(probe: P, settings: ValidatorSettings) -> Self {
        Self {
            probe,
            settings,
            report: Report::stdout(),
        }
    }

    /// Replace the console printer (tests use a quiet one)
    pub fn with_report(mut self, report: Report) -> Self {
        self.report = report;
        self
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub async fn run(&self) -> Result<ValidationReport> {
        self.report.header("SECURITY PIPELINE - END-TO-END VALIDATION");
        self.report
            .info(&format!("Validation started at: {}", Utc::now().to_rfc3339()));

        self.verify_infrastructure().await?;

        let events = validation_events();
        self.report.header("SENDING EVENTS TO KINESIS");
        let dispatch_start = Utc::now();
        let events_sent = self.send_events(&events).await;
        self.report.info(&format!(
            "Successfully sent {}/{} events",
            events_sent,
            events.len()
        ));

        self.report.header("WAITING FOR LAMBDA PROCESSING");
        self.report.info(&format!(
            "Waiting {} seconds for the function to process events...",
            self.settings.processing_wait.as_secs()
        ));
        tokio::time::sleep(self.settings.processing_wait).await;

        self.report.header("CHECKING LAMBDA EXECUTION LOGS");
        let log_messages = match self
            .probe
            .filter_log_events(&self.settings.log_marker, dispatch_start)
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                self.report.error(&format!("Failed to check logs: {}", e));
                Vec::new()
            }
        };
        if log_messages.is_empty() {
            self.report.error("No processing logs found");
        } else {
            self.report.success(&format!(
                "Found {} processing log entries",
                log_messages.len()
            ));
        }
        // Most recent batches, oldest first
        let log_samples = log_messages[log_messages.len().saturating_sub(LOG_SAMPLES)..].to_vec();
        for message in &log_samples {
            self.report.info(&format!("  {}", message.trim_end()));
        }

        self.report.header("CHECKING S3 DATA LAKE");
        let objects = match self
            .probe
            .list_objects(&self.settings.object_prefix, self.settings.max_objects)
            .await
        {
            Ok(keys) => keys,
            Err(e) => {
                self.report.error(&format!("Failed to check S3: {}", e));
                Vec::new()
            }
        };
        if objects.is_empty() {
            self.report.error("No objects found in S3 data lake");
        } else {
            self.report
                .success(&format!("Found {} objects in S3 data lake", objects.len()));
            for key in objects.iter().take(OBJECT_SAMPLES) {
                self.report.info(&format!("  {}", key));
            }
        }

        let summary = ValidationReport {
            events_sent,
            events_total: events.len(),
            log_matches: log_messages.len(),
            log_samples,
            objects_found: objects.len(),
            object_samples: objects.into_iter().take(OBJECT_SAMPLES).collect(),
        };
        self.report.summary(&summary);
        Ok(summary)
    }

    /// Check every resource and halt before anything is published
    async fn verify_infrastructure(&self) -> Result<()> {
        self.report.header("INFRASTRUCTURE VERIFICATION");
        let mut failures = Vec::new();

        match self.probe.stream_status().await {
            Ok(status) if status == STREAM_ACTIVE => {
                self.report.success(&format!("Kinesis Stream - {}", status))
            }
            Ok(status) => {
                self.report.error(&format!("Kinesis Stream - {}", status));
                failures.push(format!("stream is {}", status));
            }
            Err(e) => {
                self.report
                    .error(&format!("Kinesis Stream check failed: {}", e));
                failures.push(e.to_string());
            }
        }

        match self.probe.function_state().await {
            Ok(state) if state == FUNCTION_ACTIVE => {
                self.report.success(&format!("Lambda Function - {}", state))
            }
            Ok(state) => {
                self.report.error(&format!("Lambda Function - {}", state));
                failures.push(format!("function is {}", state));
            }
            Err(e) => {
                self.report
                    .error(&format!("Lambda Function check failed: {}", e));
                failures.push(e.to_string());
            }
        }

        match self.probe.bucket_exists().await {
            Ok(()) => self.report.success("S3 Bucket - Accessible"),
            Err(e) => {
                self.report.error(&format!("S3 Bucket check failed: {}", e));
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            self.report
                .error("Infrastructure verification failed. Exiting.");
            Err(HarnessError::HealthCheckFailed(failures.join("; ")))
        }
    }

    async fn send_events(&self, events: &[SampleEvent]) -> usize {
        let mut sent = 0;
        for event in events {
            let partition_key = Uuid::new_v4().to_string();
            let result = match serde_json::to_vec(&event.payload) {
                Ok(data) => self.probe.put_record(data, &partition_key).await,
                Err(e) => Err(HarnessError::cloud("Encoding payload", e)),
            };

            match result {
                Ok(sequence_number) => {
                    sent += 1;
                    self.report
                        .success(&format!("Sent {} to Kinesis", event.name));
                    self.report
                        .info(&format!("Sequence Number: {}", sequence_number));
                }
                Err(e) => {
                    tracing::debug!(event = event.name, error = %e, "put_record failed");
                    self.report
                        .error(&format!("Failed to send {}: {}", event.name, e));
                }
            }

            tokio::time::sleep(self.settings.send_delay).await;
        }
        sent
    }
}
