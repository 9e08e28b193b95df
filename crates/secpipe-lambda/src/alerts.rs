// Alert delivery
//
// SNS when a topic is configured, otherwise alerts only reach the function log.

use anyhow::{Context, Result};
use async_trait::async_trait;
use secpipe_core::SecurityAlert;
use tracing::{info, warn};

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, alert: &SecurityAlert) -> Result<()>;
}

pub struct SnsAlertSink {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsAlertSink {
    pub fn new(client: aws_sdk_sns::Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }
}

/// SNS caps subjects at 100 characters
const MAX_SUBJECT_LEN: usize = 100;

fn truncate_subject(subject: &str) -> String {
    subject.chars().take(MAX_SUBJECT_LEN).collect()
}

#[async_trait]
impl AlertSink for SnsAlertSink {
    async fn publish(&self, alert: &SecurityAlert) -> Result<()> {
        let message =
            serde_json::to_string_pretty(alert).context("Failed to encode alert message")?;

        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(truncate_subject(&alert.subject))
            .message(message)
            .send()
            .await
            .with_context(|| format!("Failed to publish alert to {}", self.topic_arn))?;

        info!(
            event_id = %alert.event_summary.event_id,
            severity = %alert.severity,
            "Alert generated for event {}",
            alert.event_summary.event_id
        );
        Ok(())
    }
}

/// Fallback when no topic is configured
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn publish(&self, alert: &SecurityAlert) -> Result<()> {
        warn!(
            event_id = %alert.event_summary.event_id,
            severity = %alert.severity,
            risk_score = alert.event_summary.risk_score,
            subject = %alert.subject,
            "No SNS topic configured for alerts"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_subjects_are_truncated() {
        let subject = format!("Security Alert: {}", "X".repeat(200));
        assert_eq!(truncate_subject(&subject).chars().count(), MAX_SUBJECT_LEN);
        assert_eq!(truncate_subject("short"), "short");
    }
}
