// Offline processing of captured events
//
// Runs a file of raw events through the same batch pipeline the function
// uses, writing into the configured storage (a local directory by default).
// Alerts only go to the log.

use anyhow::{Context, Result};
use secpipe_config::{FsConfig, RuntimeConfig, StorageBackend};
use secpipe_core::{EventProcessor, ProcessingStats};
use secpipe_lambda::{
    alert_policy_from_config, enricher_from_config, InboundRecord, LogAlertSink, Pipeline,
};
use secpipe_writer::EventWriter;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Split file contents into records
///
/// Accepts a JSON array of events, a single event object, or JSON lines.
/// Lines that fail to parse are kept so the pipeline counts them as failures.
pub fn read_records(contents: &str) -> Result<Vec<InboundRecord>> {
    let to_record = |index: usize, data: Vec<u8>| InboundRecord {
        event_id: Some(format!("record-{}", index)),
        data,
    };

    match serde_json::from_str::<Value>(contents) {
        Ok(Value::Array(events)) => events
            .iter()
            .enumerate()
            .map(|(i, event)| {
                serde_json::to_vec(event)
                    .map(|data| to_record(i, data))
                    .context("Failed to encode event")
            })
            .collect(),
        Ok(event @ Value::Object(_)) => {
            let data = serde_json::to_vec(&event).context("Failed to encode event")?;
            Ok(vec![to_record(0, data)])
        }
        _ => Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| to_record(i, line.as_bytes().to_vec()))
            .collect()),
    }
}

/// Point filesystem storage at `dir`
pub fn use_output_dir(config: &mut RuntimeConfig, dir: &Path) {
    config.storage.backend = StorageBackend::Fs;
    config.storage.fs = Some(FsConfig {
        path: dir.to_string_lossy().to_string(),
    });
}

/// Process every event in `input` and return the batch statistics
pub async fn process_file(config: &RuntimeConfig, input: &Path) -> Result<ProcessingStats> {
    let contents = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let records = read_records(&contents)?;

    if config.storage.backend == StorageBackend::Fs {
        if let Some(fs) = &config.storage.fs {
            tokio::fs::create_dir_all(&fs.path)
                .await
                .with_context(|| format!("Failed to create output directory: {}", fs.path))?;
        }
    }

    let operator = secpipe_writer::build_operator(&config.storage)
        .context("Failed to initialize storage")?;
    let writer = EventWriter::new(operator, config.storage.prefix.clone());

    let pipeline = Pipeline::new(
        EventProcessor::new(enricher_from_config(config)?),
        alert_policy_from_config(config),
        writer,
        Arc::new(LogAlertSink),
    );

    Ok(pipeline.process_records(records).await)
}
