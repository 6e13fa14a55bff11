//! CLI command implementations.

pub mod bulk;
pub mod monitor;
pub mod status;
pub mod templates;
pub mod trigger;
pub mod workflow;

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::models::Config;

/// Load configuration, honoring `--config`.
pub fn load_config(dir: Option<&Path>) -> Result<Config> {
    let config = match dir {
        Some(dir) => crate::infrastructure::config::load_from(dir)?,
        None => crate::infrastructure::config::load()?,
    };
    Ok(config)
}

/// Read and parse a JSON file, `-` meaning stdin.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("reading stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
