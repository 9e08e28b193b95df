// Synthetic event producer
//
// Emits `rate` random security events per second for `duration`. Events go to
// stdout or a file as JSON lines, or straight onto a Kinesis stream.

use anyhow::{Context, Result};
use secpipe_core::EventGenerator;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;
use uuid::Uuid;

use crate::harness::PipelineProbe;

/// Where generated events are sent
pub enum EventSink {
    Stdout,
    File(PathBuf),
    Stream(Box<dyn PipelineProbe>),
}

#[derive(Debug, Clone, Copy)]
pub struct ProduceOptions {
    /// Events per second
    pub rate: u32,
    pub duration: Duration,
}

impl ProduceOptions {
    pub fn total_events(&self) -> u64 {
        u64::from(self.rate) * self.duration.as_secs()
    }

    fn tick(&self) -> Duration {
        (Duration::from_secs(1) / self.rate.max(1)).max(Duration::from_nanos(1))
    }
}

/// Generate events into `sink`, returning how many were delivered
pub async fn produce(
    generator: &mut EventGenerator,
    options: ProduceOptions,
    sink: EventSink,
) -> Result<u64> {
    anyhow::ensure!(options.rate > 0, "--rate must be at least 1");

    info!(
        rate = options.rate,
        duration_secs = options.duration.as_secs(),
        "Producing {} events",
        options.total_events()
    );

    let delivered = match sink {
        EventSink::Stdout => {
            let mut stdout = tokio::io::stdout();
            write_lines(generator, options, &mut stdout).await?
        }
        EventSink::File(path) => {
            let mut file = tokio::fs::File::create(&path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            write_lines(generator, options, &mut file).await?
        }
        EventSink::Stream(probe) => put_records(generator, options, probe.as_ref()).await,
    };

    info!("Produced {} events", delivered);
    Ok(delivered)
}

async fn write_lines<W: AsyncWrite + Unpin>(
    generator: &mut EventGenerator,
    options: ProduceOptions,
    out: &mut W,
) -> Result<u64> {
    let mut interval = tokio::time::interval(options.tick());
    let mut written = 0;

    for _ in 0..options.total_events() {
        interval.tick().await;
        let line = to_line(&generator.next_event())?;
        out.write_all(line.as_bytes())
            .await
            .context("Failed to write event")?;
        written += 1;
    }

    out.flush().await.context("Failed to flush output")?;
    Ok(written)
}

async fn put_records(
    generator: &mut EventGenerator,
    options: ProduceOptions,
    probe: &dyn PipelineProbe,
) -> u64 {
    let mut interval = tokio::time::interval(options.tick());
    let mut sent = 0;

    for _ in 0..options.total_events() {
        interval.tick().await;
        let event = generator.next_event();
        let data = match serde_json::to_vec(&event) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Skipping unencodable event: {}", e);
                continue;
            }
        };

        match probe.put_record(data, &Uuid::new_v4().to_string()).await {
            Ok(sequence_number) => {
                tracing::debug!(sequence_number = %sequence_number, "Record sent");
                sent += 1;
            }
            Err(e) => tracing::warn!("Failed to send event: {}", e),
        }
    }
    sent
}

fn to_line(event: &Value) -> Result<String> {
    let mut line = serde_json::to_string(event).context("Failed to encode event")?;
    line.push('\n');
    Ok(line)
}
