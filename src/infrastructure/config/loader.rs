//! Layered configuration loading.
//!
//! Sources, later wins:
//! 1. Built-in defaults
//! 2. `.cadence/config.yaml`
//! 3. `.cadence/local.yaml` (gitignored overrides)
//! 4. `CADENCE_*` environment variables (`__` separates nesting, e.g.
//!    `CADENCE_NOTION__API_KEY`)

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

use crate::domain::models::Config;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["json", "pretty"];

/// Configuration loading or validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from the default `.cadence/` directory.
pub fn load() -> Result<Config, ConfigError> {
    load_from(Path::new(".cadence"))
}

/// Load configuration rooted at `dir`.
pub fn load_from(dir: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Yaml::file(dir.join("config.yaml")))
        .merge(Yaml::file(dir.join("local.yaml")))
        .merge(Env::prefixed("CADENCE_").split("__"))
        .extract()?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "logging.level must be one of {LOG_LEVELS:?}, got '{}'",
            config.logging.level
        )));
    }
    if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "logging.format must be one of {LOG_FORMATS:?}, got '{}'",
            config.logging.format
        )));
    }
    if config.circuit.failure_threshold == 0 {
        return Err(ConfigError::Invalid(
            "circuit.failure_threshold must be at least 1".to_string(),
        ));
    }
    if config.circuit.half_open_max_calls == 0 {
        return Err(ConfigError::Invalid(
            "circuit.half_open_max_calls must be at least 1".to_string(),
        ));
    }
    if config.monitor.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "monitor.poll_interval_secs must be at least 1".to_string(),
        ));
    }
    if config.notion.requests_per_second == 0 {
        return Err(ConfigError::Invalid(
            "notion.requests_per_second must be at least 1".to_string(),
        ));
    }
    Ok(())
}
