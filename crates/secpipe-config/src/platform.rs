// Platform detection based on environment variables
//
// Auto-detects runtime environment:
// - AWS Lambda: AWS_LAMBDA_FUNCTION_NAME env var present
// - Local: operator workstation or CI (default)

use std::env;

use crate::{LogFormat, StorageBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Local,
    Lambda,
}

impl Platform {
    /// Auto-detect the current platform based on environment variables
    pub fn detect() -> Self {
        if env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
            Platform::Lambda
        } else {
            Platform::Local
        }
    }

    /// Get platform-specific defaults
    pub fn defaults(&self) -> PlatformDefaults {
        match self {
            Platform::Local => PlatformDefaults {
                storage_backend: StorageBackend::Fs,
                log_format: LogFormat::Text,
                region: "us-east-1",
            },
            // CloudWatch ingests one JSON object per line
            Platform::Lambda => PlatformDefaults {
                storage_backend: StorageBackend::S3,
                log_format: LogFormat::Json,
                region: "us-east-1",
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlatformDefaults {
    pub storage_backend: StorageBackend,
    pub log_format: LogFormat,
    pub region: &'static str,
}
