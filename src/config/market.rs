//! Market-data/ranking service configuration.

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::resolver::TieBreak;

use super::error::ValidationError;

/// Market-data/ranking service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    /// Base URL of the ranking API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key, if the provider wants one.
    pub api_key: Option<Secret<String>>,

    /// How long the cached ranking universe stays fresh.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// How many listings the cache pulls per refresh.
    #[serde(default = "default_universe_limit")]
    pub universe_limit: u32,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per lookup, including the first.
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,

    /// Order for candidates sharing a market rank.
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl MarketConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http") {
            return Err(ValidationError::invalid(
                "market.base_url",
                format!("'{}' is not an http(s) URL", self.base_url),
            ));
        }
        if self.universe_limit == 0 {
            return Err(ValidationError::invalid(
                "market.universe_limit",
                "must be at least 1",
            ));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::invalid(
                "market.max_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            cache_ttl_secs: default_cache_ttl(),
            universe_limit: default_universe_limit(),
            timeout_secs: default_timeout(),
            max_attempts: default_attempts(),
            tie_break: TieBreak::default(),
        }
    }
}

fn default_base_url() -> String {
    "https://pro-api.coinmarketcap.com/v1".to_string()
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_universe_limit() -> u32 {
    250
}

fn default_timeout() -> u64 {
    10
}

fn default_attempts() -> u32 {
    3
}
