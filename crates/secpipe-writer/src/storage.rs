//! Storage operator initialization and management.

use once_cell::sync::OnceCell;
use opendal::Operator;
use secpipe_config::{RuntimeConfig, StorageBackend, StorageConfig};

use crate::error::{Result, WriterError};

static OPERATOR: OnceCell<Operator> = OnceCell::new();

/// Build an operator for the configured backend.
pub fn build_operator(config: &StorageConfig) -> Result<Operator> {
    let operator = match config.backend {
        StorageBackend::Fs => {
            let fs = config.fs.as_ref().ok_or_else(|| {
                WriterError::invalid_config("fs config required for filesystem backend")
            })?;

            let fs_builder = opendal::services::Fs::default().root(&fs.path);
            Operator::new(fs_builder)
                .map_err(|e| {
                    WriterError::invalid_config(format!(
                        "Failed to create filesystem operator: {}",
                        e
                    ))
                })?
                .finish()
        }
        StorageBackend::S3 => {
            let s3 = config
                .s3
                .as_ref()
                .ok_or_else(|| WriterError::invalid_config("s3 config required for S3 backend"))?;

            let mut s3_builder = opendal::services::S3::default()
                .bucket(&s3.bucket)
                .region(&s3.region);

            if let Some(endpoint) = &s3.endpoint {
                s3_builder = s3_builder.endpoint(endpoint);
            }

            Operator::new(s3_builder)
                .map_err(|e| {
                    WriterError::invalid_config(format!("Failed to create S3 operator: {}", e))
                })?
                .finish()
        }
        StorageBackend::Memory => Operator::new(opendal::services::Memory::default())
            .map_err(|e| {
                WriterError::invalid_config(format!("Failed to create memory operator: {}", e))
            })?
            .finish(),
    };

    Ok(operator)
}

/// Initialize the process-wide storage operator from RuntimeConfig.
pub fn initialize_storage(config: &RuntimeConfig) -> Result<()> {
    if OPERATOR.get().is_some() {
        return Ok(());
    }

    let operator = build_operator(&config.storage)?;

    match OPERATOR.set(operator) {
        Ok(_) => {
            tracing::debug!(backend = %config.storage.backend, "Storage operator initialized");
            Ok(())
        }
        Err(_) => {
            tracing::debug!("Storage operator already initialized by another call");
            Ok(())
        }
    }
}

/// Get a clone of the global storage operator.
pub fn get_operator_clone() -> Option<Operator> {
    OPERATOR.get().cloned()
}
