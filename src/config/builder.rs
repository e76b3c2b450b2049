//! Transaction-construction service configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Transaction-construction service configuration.
///
/// The base URL has no default; startup fails without one.
#[derive(Debug, Clone, Deserialize)]
pub struct BuilderConfig {
    /// Base URL of the transaction-construction API.
    pub base_url: String,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per build call, including the first. Retries apply
    /// only to transient failures, never to validation rejections.
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,
}

impl BuilderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("builder.base_url"));
        }
        if !self.base_url.starts_with("http") {
            return Err(ValidationError::invalid(
                "builder.base_url",
                format!("'{}' is not an http(s) URL", self.base_url),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::invalid(
                "builder.max_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_attempts() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> BuilderConfig {
        BuilderConfig {
            base_url: url.to_string(),
            timeout_secs: default_timeout(),
            max_attempts: default_attempts(),
        }
    }

    #[test]
    fn https_url_validates() {
        assert!(with_url("https://builder.internal").validate().is_ok());
    }

    #[test]
    fn empty_and_non_http_urls_are_rejected() {
        assert!(with_url("").validate().is_err());
        assert!(with_url("builder.internal").validate().is_err());
    }
}
