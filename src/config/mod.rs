#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub outbound: OutboundConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcp-gateway".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutboundConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            initial_delay_ms: 500,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid server name (cannot be empty)")]
    InvalidServerName,
    #[error("Invalid cache TTL: {0} (must be between 1 and 86400 seconds)")]
    InvalidCacheTtl(u64),
    #[error("Invalid sweep interval: {0} (must be between 1 and 3600 seconds)")]
    InvalidSweepInterval(u64),
    #[error("Invalid outbound timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid max retries: {0} (must be 10 or fewer)")]
    InvalidMaxRetries(u32),
    #[error("Invalid initial retry delay: {0} (must be between 1 and 60000 ms)")]
    InvalidInitialDelay(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl GatewayConfig {
    /// Load configuration from `config.toml` under the given directory,
    /// falling back to defaults when the file does not exist.
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: GatewayConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load from the platform default config directory.
    #[inline]
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_dir()?)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.base_dir.join("config.toml");
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::InvalidServerName);
        }
        if !(1..=86_400).contains(&self.cache.default_ttl_secs) {
            return Err(ConfigError::InvalidCacheTtl(self.cache.default_ttl_secs));
        }
        if !(1..=3_600).contains(&self.cache.sweep_interval_secs) {
            return Err(ConfigError::InvalidSweepInterval(
                self.cache.sweep_interval_secs,
            ));
        }
        if !(1..=300).contains(&self.outbound.timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.outbound.timeout_secs));
        }
        if self.outbound.max_retries > 10 {
            return Err(ConfigError::InvalidMaxRetries(self.outbound.max_retries));
        }
        if !(1..=60_000).contains(&self.outbound.initial_delay_ms) {
            return Err(ConfigError::InvalidInitialDelay(
                self.outbound.initial_delay_ms,
            ));
        }
        Ok(())
    }
}

/// The platform config directory for the gateway.
#[inline]
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("mcp-gateway"))
        .ok_or(ConfigError::DirectoryError)
}
