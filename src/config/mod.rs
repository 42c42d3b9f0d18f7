//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Official API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API base URL
    #[serde(default = "default_api_base")]
    pub base_url: String,

    /// Bearer token
    #[serde(default)]
    pub token: String,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_seconds: u64,

    /// In-memory response cache lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

fn default_api_base() -> String {
    "https://api.clashroyale.com/v1".to_string()
}

fn default_api_timeout() -> u64 {
    8
}

fn default_cache_ttl() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            token: String::new(),
            timeout_seconds: default_api_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

/// Community site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunityConfig {
    /// Site base URL
    #[serde(default = "default_community_base")]
    pub base_url: String,

    /// Request timeout in seconds (full page fetches; slower tier)
    #[serde(default = "default_community_timeout")]
    pub timeout_seconds: u64,

    /// User agent sent to the site
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_community_base() -> String {
    "https://royaleapi.com".to_string()
}

fn default_community_timeout() -> u64 {
    12
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            base_url: default_community_base(),
            timeout_seconds: default_community_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl CommunityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// History service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Number of weeks returned per query
    #[serde(default = "default_week_limit")]
    pub week_limit: usize,
}

fn default_week_limit() -> usize {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            week_limit: default_week_limit(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub community: CommunityConfig,

    #[serde(default)]
    pub history: HistoryConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api: ApiConfig::default(),
            community: CommunityConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "API base URL must not be empty".to_string(),
            ));
        }

        if self.api.timeout_seconds == 0 || self.community.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        if self.history.week_limit == 0 {
            return Err(ConfigError::ValidationError(
                "Week limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
