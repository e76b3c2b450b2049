//! Language-understanding service configuration.

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::features::FeatureFlags;

/// Language-understanding service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NluConfig {
    /// API key. Required unless the mock extractor is enabled.
    pub api_key: Option<Secret<String>>,

    /// Model to use for structured extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the chat-completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per extraction call, including the first.
    #[serde(default = "default_attempts")]
    pub max_attempts: u32,

    /// Extractions below this confidence route to a clarification instead of
    /// proceeding.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl NluConfig {
    /// Per-attempt timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self, features: &FeatureFlags) -> Result<(), ValidationError> {
        if !features.mock_extractor && self.api_key.is_none() {
            return Err(ValidationError::MissingRequired("nlu.api_key"));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ValidationError::invalid(
                "nlu.confidence_threshold",
                format!("must be within [0, 1], got {}", self.confidence_threshold),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::invalid(
                "nlu.max_attempts",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_attempts: default_attempts(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_attempts() -> u32 {
    3
}

fn default_confidence_threshold() -> f64 {
    0.6
}
