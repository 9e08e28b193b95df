//! Error types for the data lake writer

use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Configuration missing or invalid
    E001InvalidConfig,
    /// E002: Write operation failed
    E002WriteFailure,
    /// E003: Event could not be serialized or deserialized
    E003Serialization,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001InvalidConfig => "E001",
            Self::E002WriteFailure => "E002",
            Self::E003Serialization => "E003",
        }
    }
}

/// Errors that can occur while persisting events
#[derive(Debug, Error)]
pub enum WriterError {
    /// Invalid configuration provided
    #[error("[{code}] Invalid storage configuration: {message}")]
    InvalidConfig { code: &'static str, message: String },

    /// Storage write (or read-back) failed
    #[error("[{code}] Storage operation on '{key}' failed: {message}\n\nTroubleshooting:\n  • Check the bucket or directory exists\n  • Verify the function role allows s3:PutObject")]
    WriteFailure {
        code: &'static str,
        key: String,
        message: String,
    },

    /// Event document could not be encoded or decoded
    #[error("[{code}] Event serialization failed: {source}")]
    Serialization {
        code: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl WriterError {
    /// Create an invalid config error with error code
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            code: ErrorCode::E001InvalidConfig.as_str(),
            message: message.into(),
        }
    }

    /// Create a write failure error with error code
    pub fn write_failure(key: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::WriteFailure {
            code: ErrorCode::E002WriteFailure.as_str(),
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn serialization(source: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::E003Serialization.as_str(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig { .. } => ErrorCode::E001InvalidConfig,
            Self::WriteFailure { .. } => ErrorCode::E002WriteFailure,
            Self::Serialization { .. } => ErrorCode::E003Serialization,
        }
    }
}

/// Result type alias for WriterError
pub type Result<T> = std::result::Result<T, WriterError>;
