// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use std::net::IpAddr;
use tracing::warn;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_storage_config(&config.storage)?;
    validate_enrichment_config(&config.enrichment)?;
    validate_alert_config(&config.alerts)?;
    validate_log_config(&config.log)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    match config.backend {
        StorageBackend::Fs => {
            let fs = config
                .fs
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("fs storage backend requires 'fs' configuration"))?;

            if fs.path.is_empty() {
                bail!("storage.fs.path must not be empty");
            }
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("s3 storage backend requires 's3' configuration"))?;

            if s3.bucket.is_empty() {
                bail!("storage.s3.bucket is required for S3 backend (or set S3_BUCKET_NAME)");
            }

            if s3.region.is_empty() {
                bail!("storage.s3.region is required for S3 backend");
            }
        }
        StorageBackend::Memory => {
            warn!("memory storage backend selected; events will not outlive the process");
        }
    }

    Ok(())
}

fn validate_enrichment_config(config: &EnrichmentConfig) -> Result<()> {
    for ip in config.blocklist.iter().chain(config.geo.keys()) {
        if ip.trim().parse::<IpAddr>().is_err() {
            bail!("enrichment tables contain an invalid IP address: '{}'", ip);
        }
    }

    for country in config.high_risk_countries.iter().chain(config.geo.values()) {
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            bail!(
                "enrichment country codes must be two-letter ISO codes, got '{}'",
                country
            );
        }
    }

    Ok(())
}

fn validate_alert_config(config: &AlertConfig) -> Result<()> {
    if config.risk_threshold == 0 || config.risk_threshold > 100 {
        bail!("alerts.risk_threshold must be between 1 and 100");
    }

    if !(config.severity_threshold > 0.0 && config.severity_threshold <= 10.0) {
        bail!("alerts.severity_threshold must be greater than 0 and at most 10");
    }

    if let Some(arn) = &config.sns_topic_arn {
        if !arn.starts_with("arn:") {
            warn!(
                sns_topic_arn = %arn,
                "alerts.sns_topic_arn does not look like an ARN; publishing will likely fail"
            );
        }
    }

    Ok(())
}

fn validate_log_config(config: &LogConfig) -> Result<()> {
    if config.level.trim().is_empty() {
        bail!("log.level must not be empty");
    }
    Ok(())
}

pub fn validate_harness_config(config: &HarnessConfig) -> Result<()> {
    if config.region.is_empty() {
        bail!("harness.region must not be empty");
    }

    if config.stream_name.is_empty() {
        bail!("harness.stream_name must not be empty");
    }

    if config.function_name.is_empty() {
        bail!("harness.function_name must not be empty");
    }

    if config.bucket.is_empty() {
        bail!("harness.bucket is required (or set SECPIPE_HARNESS_BUCKET)");
    }

    if config.log_marker.is_empty() {
        bail!("harness.log_marker must not be empty");
    }

    if config.max_objects <= 0 {
        bail!("harness.max_objects must be greater than 0");
    }

    if config.processing_wait_secs > 15 * 60 {
        warn!(
            processing_wait_secs = config.processing_wait_secs,
            "harness.processing_wait_secs exceeds the Lambda timeout ceiling"
        );
    }

    Ok(())
}
