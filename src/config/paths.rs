use std::path::PathBuf;

use anyhow::{Context, Result};

/// Returns the default settings path: ~/.config/varlog/config.toml
pub fn default_config_path() -> Result<PathBuf> {
    let config = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config.join("varlog").join("config.toml"))
}
