// AWS Lambda runtime adapter
//
// Consumes Kinesis batches, stores every processed event in S3 through
// OpenDAL and publishes alerts to SNS.
//
// Philosophy: Use lambda_runtime's provided tokio
// We don't add our own tokio - lambda_runtime provides it

use aws_lambda_events::event::kinesis::KinesisEvent;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use secpipe_config::{LogFormat, RuntimeConfig};
use secpipe_core::{AlertPolicy, Enricher, EventProcessor};
use secpipe_writer::EventWriter;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

mod alerts;
mod pipeline;

pub use alerts::{AlertSink, LogAlertSink, SnsAlertSink};
pub use pipeline::{BatchResponse, InboundRecord, Pipeline};

async fn handle_event(
    event: LambdaEvent<KinesisEvent>,
    pipeline: Arc<Pipeline>,
) -> Result<BatchResponse, Error> {
    let (event, context) = event.into_parts();
    let records = event.records.into_iter().map(InboundRecord::from).collect();

    let stats = pipeline.process_records(records).await;

    Ok(BatchResponse::ok(stats, remaining_millis(context.deadline)))
}

fn remaining_millis(deadline_ms: u64) -> u64 {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    deadline_ms.saturating_sub(now_ms)
}

/// Build the enricher from the configured lookup tables
pub fn enricher_from_config(config: &RuntimeConfig) -> anyhow::Result<Enricher> {
    let tables = &config.enrichment;
    let enricher = Enricher::from_tables(
        tables.blocklist.iter().map(String::as_str),
        tables.high_risk_countries.iter().map(String::as_str),
        tables.geo.iter().map(|(ip, country)| (ip.as_str(), country.as_str())),
    )?;
    Ok(enricher)
}

pub fn alert_policy_from_config(config: &RuntimeConfig) -> AlertPolicy {
    AlertPolicy {
        risk_threshold: config.alerts.risk_threshold,
        severity_threshold: config.alerts.severity_threshold,
        ..AlertPolicy::default()
    }
}

fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // CloudWatch adds its own timestamps and does not render ANSI
    let layer = fmt::layer().with_ansi(false).without_time();
    let registry = tracing_subscriber::registry().with(env_filter);

    let _ = match config.log.format {
        LogFormat::Json => tracing::subscriber::set_global_default(registry.with(layer.json())),
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(layer)),
    };
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    let config = RuntimeConfig::load()
        .map_err(|e| Error::from(format!("Failed to load configuration: {:#}", e)))?;
    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        built = env!("BUILD_TIMESTAMP"),
        backend = %config.storage.backend,
        "Starting security event processor"
    );

    secpipe_writer::initialize_storage(&config)
        .map_err(|e| Error::from(format!("Failed to initialize storage: {}", e)))?;
    let writer = EventWriter::from_global(config.storage.prefix.clone())?;

    let enricher = enricher_from_config(&config)
        .map_err(|e| Error::from(format!("Invalid enrichment tables: {:#}", e)))?;

    let alerts: Arc<dyn AlertSink> = match &config.alerts.sns_topic_arn {
        Some(topic_arn) => {
            let sdk_config = aws_config::load_from_env().await;
            info!(topic_arn = %topic_arn, "Publishing alerts to SNS");
            Arc::new(SnsAlertSink::new(
                aws_sdk_sns::Client::new(&sdk_config),
                topic_arn.clone(),
            ))
        }
        None => Arc::new(LogAlertSink),
    };

    let pipeline = Arc::new(Pipeline::new(
        EventProcessor::new(enricher),
        alert_policy_from_config(&config),
        writer,
        alerts,
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<KinesisEvent>| {
        let pipeline = pipeline.clone();
        async move { handle_event(event, pipeline).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use secpipe_config::Platform;

    #[test]
    fn config_tables_feed_the_enricher() {
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Local);
        config
            .enrichment
            .geo
            .insert("198.51.100.7".to_string(), "RU".to_string());

        let enricher = enricher_from_config(&config).unwrap();
        let geo = enricher.geolocate("198.51.100.7").unwrap();
        assert_eq!(geo.country.as_deref(), Some("RU"));
        assert!(enricher.threat_intel(Some("10.0.0.50")).is_known_threat);
    }

    #[test]
    fn alert_thresholds_come_from_config() {
        let mut config = RuntimeConfig::from_platform_defaults(Platform::Local);
        config.alerts.risk_threshold = 50;
        let policy = alert_policy_from_config(&config);
        assert_eq!(policy.risk_threshold, 50);
        assert_eq!(policy.high_severity_score, 80);
    }

    #[test]
    fn remaining_time_never_underflows() {
        assert_eq!(remaining_millis(0), 0);
    }
}
