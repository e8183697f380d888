//! Client configuration
//!
//! Loads configuration from environment variables (with `.env` support).

use std::env;
use thiserror::Error;

/// Configuration for a cord client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bot authentication token
    pub token: String,
    /// Gateway WebSocket URL
    pub gateway_url: String,
    /// REST API base URL
    pub api_base_url: String,
    /// Number of gateway shards to run
    pub shard_count: u32,
    /// Deployment environment (affects default log formatting)
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

// Default value functions
fn default_gateway_url() -> String {
    "wss://gateway.example.chat/?v=9&encoding=json".to_string()
}

fn default_api_base_url() -> String {
    "https://api.example.chat/v9".to_string()
}

fn default_shard_count() -> u32 {
    1
}

// Shard count from the raw env value; unparseable values fall back to
// the default and 0 is floored to 1, same as `with_shard_count`.
fn shard_count_from(raw: Option<String>) -> u32 {
    raw.and_then(|s| s.parse::<u32>().ok())
        .map_or_else(default_shard_count, |n| n.max(1))
}

impl ClientConfig {
    /// Build a configuration with just a token and defaults for the rest
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            gateway_url: default_gateway_url(),
            api_base_url: default_api_base_url(),
            shard_count: default_shard_count(),
            env: Environment::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `CORD_TOKEN` is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            token: env::var("CORD_TOKEN").map_err(|_| ConfigError::MissingVar("CORD_TOKEN"))?,
            gateway_url: env::var("CORD_GATEWAY_URL").unwrap_or_else(|_| default_gateway_url()),
            api_base_url: env::var("CORD_API_BASE_URL").unwrap_or_else(|_| default_api_base_url()),
            shard_count: shard_count_from(env::var("CORD_SHARD_COUNT").ok()),
            env: env::var("CORD_ENV")
                .ok()
                .and_then(|s| match s.to_lowercase().as_str() {
                    "production" => Some(Environment::Production),
                    "development" => Some(Environment::Development),
                    _ => None,
                })
                .unwrap_or_default(),
        })
    }

    /// Override the shard count
    #[must_use]
    pub fn with_shard_count(mut self, count: u32) -> Self {
        self.shard_count = count.max(1);
        self
    }

    /// Override the gateway URL
    #[must_use]
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }
}

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {0}")]
    InvalidVar(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("token");
        assert_eq!(config.shard_count, 1);
        assert!(config.gateway_url.starts_with("wss://"));
        assert!(!config.env.is_production());
    }

    #[test]
    fn test_shard_count_floor() {
        let config = ClientConfig::new("token").with_shard_count(0);
        assert_eq!(config.shard_count, 1);
    }

    #[test]
    fn test_env_shard_count_floors_and_defaults() {
        assert_eq!(shard_count_from(Some("4".to_string())), 4);
        assert_eq!(shard_count_from(Some("0".to_string())), 1);
        assert_eq!(shard_count_from(Some("three".to_string())), 1);
        assert_eq!(shard_count_from(None), 1);
    }
}
