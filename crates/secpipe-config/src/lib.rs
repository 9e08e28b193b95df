// secpipe-config - Unified configuration for the Lambda processor and the CLI
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from SECPIPE_CONFIG env var
// 3. Config file contents from SECPIPE_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.secpipe.toml)
// 5. Platform-specific defaults (lowest priority)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

mod env_overrides;
mod platform;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use platform::{Platform, PlatformDefaults};

/// Main runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub storage: StorageConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub harness: HarnessConfig,
}

/// One layer of TOML configuration (a file or inline content)
///
/// Every section is optional so a file can tune a single table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub storage: Option<StorageConfig>,
    pub enrichment: Option<EnrichmentConfig>,
    pub alerts: Option<AlertConfig>,
    pub log: Option<LogConfig>,
    pub harness: Option<HarnessConfig>,
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Optional path prefix placed before `security-events/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Fs,
    S3,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fs" | "filesystem" => Ok(StorageBackend::Fs),
            "s3" | "aws" => Ok(StorageBackend::S3),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            _ => anyhow::bail!(
                "Unsupported storage backend: {}. Supported: fs, s3, memory",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    pub path: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Lookup tables for geo and threat-intelligence enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Source addresses treated as known-malicious
    pub blocklist: Vec<String>,
    /// ISO country codes that add risk
    pub high_risk_countries: Vec<String>,
    /// Static address -> country code table
    #[serde(default)]
    pub geo: BTreeMap<String, String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            blocklist: vec!["192.168.1.100".to_string(), "10.0.0.50".to_string()],
            high_risk_countries: vec!["CN".to_string(), "RU".to_string(), "KP".to_string()],
            geo: BTreeMap::new(),
        }
    }
}

/// Alert publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// SNS topic for alerts; alerts are only logged when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sns_topic_arn: Option<String>,
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold: u8,
    #[serde(default = "default_severity_threshold")]
    pub severity_threshold: f64,
}

fn default_risk_threshold() -> u8 {
    70
}

fn default_severity_threshold() -> f64 {
    7.0
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sns_topic_arn: None,
            risk_threshold: default_risk_threshold(),
            severity_threshold: default_severity_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Target resources and timings for the validation harness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    pub region: String,
    /// Named AWS profile; the default credential chain is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub stream_name: String,
    pub function_name: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_send_delay_secs")]
    pub send_delay_secs: u64,
    #[serde(default = "default_processing_wait_secs")]
    pub processing_wait_secs: u64,
    #[serde(default = "default_log_marker")]
    pub log_marker: String,
    #[serde(default = "default_object_prefix")]
    pub object_prefix: String,
    #[serde(default = "default_max_objects")]
    pub max_objects: i32,
}

fn default_send_delay_secs() -> u64 {
    2
}

fn default_processing_wait_secs() -> u64 {
    30
}

fn default_log_marker() -> String {
    "Processing complete".to_string()
}

fn default_object_prefix() -> String {
    "security-events/".to_string()
}

fn default_max_objects() -> i32 {
    10
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            profile: None,
            stream_name: "security-analytics-dev-security-events".to_string(),
            function_name: "security-analytics-dev-event-processor".to_string(),
            bucket: String::new(),
            send_delay_secs: default_send_delay_secs(),
            processing_wait_secs: default_processing_wait_secs(),
            log_marker: default_log_marker(),
            object_prefix: default_object_prefix(),
            max_objects: default_max_objects(),
        }
    }
}

impl HarnessConfig {
    pub fn send_delay(&self) -> Duration {
        Duration::from_secs(self.send_delay_secs)
    }

    pub fn processing_wait(&self) -> Duration {
        Duration::from_secs(self.processing_wait_secs)
    }

    /// CloudWatch log group the function writes to
    pub fn log_group(&self) -> String {
        format!("/aws/lambda/{}", self.function_name)
    }

    /// Harness settings are only checked when the harness runs
    pub fn validate(&self) -> Result<()> {
        validation::validate_harness_config(self)
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        let platform = Platform::detect();
        sources::load_config(platform)
    }

    /// Load configuration for a specific platform (useful for testing)
    pub fn load_for_platform(platform: Platform) -> Result<Self> {
        sources::load_config(platform)
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Construct a config that contains only platform defaults (no env or files).
    pub fn from_platform_defaults(platform: Platform) -> Self {
        platform_defaults(platform)
    }

    /// Merge a config file into this one (used for TOML layering).
    ///
    /// A section present in the file replaces the current section; absent
    /// sections keep the values from the layer below.
    pub fn merge(&mut self, file: ConfigFile) {
        if let Some(storage) = file.storage {
            self.storage = storage;
        }
        if let Some(enrichment) = file.enrichment {
            self.enrichment = enrichment;
        }
        if let Some(alerts) = file.alerts {
            self.alerts = alerts;
        }
        if let Some(log) = file.log {
            self.log = log;
        }
        if let Some(harness) = file.harness {
            self.harness = harness;
        }
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a configuration for the given platform from inline config content
    /// plus overrides supplied by an `EnvSource`.
    pub fn load_for_platform_with_env<E: EnvSource>(
        platform: Platform,
        inline_config: Option<&str>,
        env: &E,
    ) -> Result<Self> {
        let mut config = RuntimeConfig::from_platform_defaults(platform);

        if let Some(inline) = inline_config {
            let file_config: ConfigFile =
                toml::from_str(inline).context("Failed to parse inline config content")?;
            config.merge(file_config);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

fn platform_defaults(platform: Platform) -> RuntimeConfig {
    let defaults = platform.defaults();

    let storage = match defaults.storage_backend {
        StorageBackend::Fs => StorageConfig {
            backend: StorageBackend::Fs,
            prefix: None,
            fs: Some(FsConfig::default()),
            s3: None,
        },
        StorageBackend::S3 => StorageConfig {
            backend: StorageBackend::S3,
            prefix: None,
            fs: None,
            s3: Some(S3Config {
                bucket: String::new(),
                region: defaults.region.to_string(),
                endpoint: None,
            }),
        },
        StorageBackend::Memory => StorageConfig {
            backend: StorageBackend::Memory,
            prefix: None,
            fs: None,
            s3: None,
        },
    };

    RuntimeConfig {
        storage,
        enrichment: EnrichmentConfig::default(),
        alerts: AlertConfig::default(),
        log: LogConfig {
            level: "info".to_string(),
            format: defaults.log_format,
        },
        harness: HarnessConfig {
            region: defaults.region.to_string(),
            ..HarnessConfig::default()
        },
    }
}
