use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Service settings (config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Directory whose files are served
    #[serde(default = "default_log_path")]
    pub log_path: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub entries: EntriesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

/// Limits on the `numEntries` query parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntriesConfig {
    #[serde(default = "default_entries")]
    pub default: usize,
    #[serde(default = "default_max_entries")]
    pub max: usize,
}

/// Values given on the command line; `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

fn default_log_path() -> String {
    "/var/log".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    120
}

fn default_shutdown_timeout() -> u64 {
    60
}

fn default_entries() -> usize {
    25
}

fn default_max_entries() -> usize {
    100_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            server: ServerConfig::default(),
            entries: EntriesConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for EntriesConfig {
    fn default() -> Self {
        Self {
            default: default_entries(),
            max: default_max_entries(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content).context("Failed to parse settings")?;
        Ok(settings)
    }

    /// Load settings from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content)
    }

    /// Resolve settings by layering: defaults -> config file -> CLI.
    ///
    /// An explicitly given config file must exist; the default one may not.
    pub fn resolve(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut settings = match config_path {
            Some(path) => Settings::load(path)?,
            None => {
                let path = super::default_config_path()?;
                if path.exists() {
                    Settings::load(&path)?
                } else {
                    Settings::default()
                }
            }
        };

        settings.apply(overrides);
        settings.validate()?;
        Ok(settings)
    }

    /// Apply command line overrides on top of these settings
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(log_path) = &overrides.log_path {
            self.log_path = log_path.clone();
        }
        if let Some(host) = &overrides.host {
            self.server.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    /// Validate the settings, returning errors for unusable values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if self.entries.default == 0 {
            bail!("entries.default must be at least 1");
        }
        if self.entries.max == 0 {
            bail!("entries.max must be at least 1");
        }
        if self.entries.default > self.entries.max {
            bail!(
                "entries.default ({}) cannot be larger than entries.max ({})",
                self.entries.default,
                self.entries.max
            );
        }
        Ok(())
    }

    /// The log directory with `~` expanded
    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.log_path).as_ref())
    }
}
