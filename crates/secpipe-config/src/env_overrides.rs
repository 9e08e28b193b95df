use super::{FsConfig, LogFormat, RuntimeConfig, S3Config, StorageBackend};
use anyhow::{anyhow, Context, Result};
use std::str::FromStr;

pub const ENV_PREFIX: &str = "SECPIPE_";

/// Abstraction over environment-variable lookups so tests can supply their
/// own source of overrides.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;

    /// Get an environment variable WITHOUT the SECPIPE_ prefix
    /// Used for the variable names the Lambda deployment sets directly
    fn get_raw(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Storage backend
    if let Some(backend) = env.get("STORAGE_BACKEND") {
        config.storage.backend = backend
            .parse::<StorageBackend>()
            .context("Invalid SECPIPE_STORAGE_BACKEND value")?;
    }
    if let Some(prefix) = env.get("STORAGE_PREFIX") {
        config.storage.prefix = normalize_prefix(prefix);
    }

    // Filesystem storage
    if let Some(path) = env.get("STORAGE_PATH") {
        config.storage.fs.get_or_insert_with(FsConfig::default).path = path;
    }

    // S3 storage; S3_BUCKET_NAME and AWS_REGION are what the function's
    // deployment sets
    if let Some(bucket) = env.get("S3_BUCKET").or_else(|| env.get_raw("S3_BUCKET_NAME")) {
        ensure_s3(config).bucket = bucket;
    }
    if let Some(region) = env.get("S3_REGION") {
        ensure_s3(config).region = region;
    } else if let (Some(region), Some(s3)) = (env.get_raw("AWS_REGION"), config.storage.s3.as_mut())
    {
        s3.region = region;
    }
    if let Some(endpoint) = env.get("S3_ENDPOINT") {
        ensure_s3(config).endpoint = Some(endpoint);
    }

    // Enrichment tables
    if let Some(list) = env.get("BLOCKLIST") {
        config.enrichment.blocklist = split_list(&list);
    }
    if let Some(list) = env.get("HIGH_RISK_COUNTRIES") {
        config.enrichment.high_risk_countries = split_list(&list);
    }

    // Alerts
    if let Some(arn) = env.get("SNS_TOPIC_ARN").or_else(|| env.get_raw("SNS_TOPIC_ARN")) {
        config.alerts.sns_topic_arn = (!arn.is_empty()).then_some(arn);
    }
    if let Some(val) = get_env_parsed::<u8, _>(env, "RISK_THRESHOLD")? {
        config.alerts.risk_threshold = val;
    }
    if let Some(val) = get_env_parsed::<f64, _>(env, "SEVERITY_THRESHOLD")? {
        config.alerts.severity_threshold = val;
    }

    // Logging
    if let Some(level) = env.get("LOG_LEVEL").or_else(|| env.get_raw("LOG_LEVEL")) {
        config.log.level = level.to_lowercase();
    }
    if let Some(format) = env.get("LOG_FORMAT") {
        config.log.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };
    }

    // Validation harness
    if let Some(region) = env.get("HARNESS_REGION") {
        config.harness.region = region;
    }
    if let Some(profile) = env.get("AWS_PROFILE").or_else(|| env.get_raw("AWS_PROFILE")) {
        config.harness.profile = (!profile.is_empty()).then_some(profile);
    }
    if let Some(stream) = env.get("STREAM_NAME") {
        config.harness.stream_name = stream;
    }
    if let Some(function) = env.get("FUNCTION_NAME") {
        config.harness.function_name = function;
    }
    if let Some(bucket) = env.get("HARNESS_BUCKET") {
        config.harness.bucket = bucket;
    }
    if let Some(val) = get_env_parsed::<u64, _>(env, "SEND_DELAY_SECS")? {
        config.harness.send_delay_secs = val;
    }
    if let Some(val) = get_env_parsed::<u64, _>(env, "PROCESSING_WAIT_SECS")? {
        config.harness.processing_wait_secs = val;
    }
    if let Some(marker) = env.get("LOG_MARKER") {
        config.harness.log_marker = marker;
    }

    Ok(())
}

fn ensure_s3(config: &mut RuntimeConfig) -> &mut S3Config {
    config.storage.s3.get_or_insert_with(|| S3Config {
        bucket: String::new(),
        region: String::new(),
        endpoint: None,
    })
}

fn get_env_parsed<T, E>(env: &E, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    E: EnvSource,
{
    match env.get(key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_prefix(prefix: String) -> Option<String> {
    if prefix.is_empty() {
        None
    } else if prefix.ends_with('/') {
        Some(prefix)
    } else {
        Some(format!("{}/", prefix))
    }
}
