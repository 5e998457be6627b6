pub mod config;

pub static CONFIG_LOCATION: &str = "./config.toml";

use std::path::Path;

use anyhow::Context;
use lazy_static::lazy_static;
use toml::from_str;
use tracing::warn;

use crate::config::config::CordexConfig;

lazy_static! {
    pub static ref CONFIG: CordexConfig = load_or_default(CONFIG_LOCATION);
}

/// Reads and deserializes the config file at `path`.
pub fn load(path: impl AsRef<Path>) -> anyhow::Result<CordexConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    from_str::<CordexConfig>(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Like [`load`], but falls back to the default configuration if the file is missing or invalid.
pub fn load_or_default(path: impl AsRef<Path>) -> CordexConfig {
    match load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration: {e:#}");
            CordexConfig::default()
        },
    }
}
