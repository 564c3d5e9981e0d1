//! Configuration management

use crate::core::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default SiteRM frontend origin
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Default port for the local web console
pub const DEFAULT_WEB_PORT: u16 = 3000;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub status: StatusConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Frontend origin, e.g. https://sitefe.example.org
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Health poll interval in seconds
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Port the local console listens on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            status: StatusConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_WEB_PORT,
        }
    }
}

impl Config {
    /// Load configuration from default location, then apply env overrides
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)?
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var("SITERM_API_URL") {
            config.api.base_url = url;
        }

        Ok(config)
    }

    /// Parse a TOML document
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.status.poll_interval_secs == 0 {
            return Err(Error::ConfigError {
                message: "status.poll_interval_secs must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::console_home()?.join("config.toml"))
    }

    /// Get the console home directory
    pub fn console_home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var("SITERM_CONSOLE_HOME") {
            return Ok(PathBuf::from(home));
        }

        ProjectDirs::from("org", "siterm", "siterm-console")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine console home directory".to_string(),
            })
    }

    /// Durable token file path
    pub fn token_path() -> Result<PathBuf> {
        Ok(Self::console_home()?.join("tokens.json"))
    }

    /// Ensure home directory exists
    pub fn ensure_home() -> Result<()> {
        let home = Self::console_home()?;
        if !home.exists() {
            std::fs::create_dir_all(&home)?;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.status.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}
