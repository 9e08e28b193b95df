// Configuration loading and logging setup for the CLI

use anyhow::{Context, Result};
use secpipe_config::{LogFormat, RuntimeConfig};
use std::path::Path;

/// Load configuration from `path` when given, otherwise from the usual layers
pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => RuntimeConfig::load().context("Failed to load configuration"),
    }
}

/// Initialize tracing/logging from RuntimeConfig
pub fn init_tracing(config: &RuntimeConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Logs go to stderr so `produce` output on stdout stays clean
    let layer = fmt::layer().with_writer(std::io::stderr);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.log.format {
        LogFormat::Json => tracing::subscriber::set_global_default(registry.with(layer.json())),
        LogFormat::Text => tracing::subscriber::set_global_default(registry.with(layer)),
    };
}
