//! Data lake writer for processed security events
//!
//! Each event becomes one JSON document under its Hive-style partition key,
//! through an OpenDAL operator (S3 in the function, the local filesystem for
//! offline runs, memory in tests).

mod error;
mod storage;

pub use error::{ErrorCode, Result, WriterError};
pub use storage::{build_operator, get_operator_clone, initialize_storage};

use opendal::Operator;
use secpipe_core::{partition_key, ProcessedEvent};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Persists processed events to the data lake
#[derive(Debug, Clone)]
pub struct EventWriter {
    operator: Operator,
    prefix: Option<String>,
}

impl EventWriter {
    pub fn new(operator: Operator, prefix: Option<String>) -> Self {
        Self { operator, prefix }
    }

    /// Writer over the operator installed by `initialize_storage`
    pub fn from_global(prefix: Option<String>) -> Result<Self> {
        let operator = get_operator_clone().ok_or_else(|| {
            WriterError::invalid_config("storage not initialized; call initialize_storage first")
        })?;
        Ok(Self::new(operator, prefix))
    }

    /// Store one event and return its object key
    pub async fn write(&self, event: &ProcessedEvent) -> Result<String> {
        let key = partition_key(event, self.prefix.as_deref());
        let body = serde_json::to_vec(event).map_err(WriterError::serialization)?;
        let size = body.len();

        // Backends without content-type support (fs) reject the option
        let mut write = self.operator.write_with(&key, body);
        if self.operator.info().full_capability().write_with_content_type {
            write = write.content_type(JSON_CONTENT_TYPE);
        }
        write
            .await
            .map_err(|e| WriterError::write_failure(&key, e))?;

        tracing::debug!(key = %key, bytes = size, "Stored security event");
        Ok(key)
    }

    /// Read a stored event back
    pub async fn read(&self, key: &str) -> Result<ProcessedEvent> {
        let buffer = self
            .operator
            .read(key)
            .await
            .map_err(|e| WriterError::write_failure(key, e))?;
        serde_json::from_slice(&buffer.to_vec()).map_err(WriterError::serialization)
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}
