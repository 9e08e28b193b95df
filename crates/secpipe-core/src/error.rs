//! Error types for event decoding and processing

use thiserror::Error;

/// Errors raised while turning a stream record into a processed event
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Payload carried the gzip magic number but did not inflate
    #[error("failed to decompress gzip payload: {0}")]
    Gzip(#[source] std::io::Error),

    /// Payload is not valid UTF-8 JSON
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is not valid standard base64
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Top-level JSON value was not an object
    #[error("security event must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// Enrichment tables contained an address that does not parse
    #[error("invalid IP address in enrichment table: '{0}'")]
    InvalidAddress(String),
}

/// Result type alias for ProcessError
pub type Result<T> = std::result::Result<T, ProcessError>;
