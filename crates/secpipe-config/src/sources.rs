// Configuration source loading
//
// Priority order:
// 1. Environment variables (SECPIPE_* prefix, then deployment names)
// 2. Config file path from SECPIPE_CONFIG
// 3. Inline config content from SECPIPE_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.secpipe.toml)
// 5. Platform defaults (based on auto-detected Platform)

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::platform::Platform;
use crate::{ConfigFile, RuntimeConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

/// Load configuration for the detected platform using native environment/file access.
pub fn load_config(platform: Platform) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::from_platform_defaults(platform);

    if let Some(file_config) = load_from_file()? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

fn load_from_file() -> Result<Option<ConfigFile>> {
    if let Ok(path) = env::var("SECPIPE_CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("SECPIPE_CONFIG_CONTENT") {
        let config: ConfigFile = toml::from_str(&content)
            .context("Failed to parse inline config from SECPIPE_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in ["./config.toml", "./.secpipe.toml"] {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
/// Unlike load_config(), this starts with the file content and then applies
/// environment overrides.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let file_config = read_config_file(path.as_ref())?;

    let mut config = RuntimeConfig::from_platform_defaults(Platform::detect());
    config.merge(file_config);

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;

    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }

    fn get_raw(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}
