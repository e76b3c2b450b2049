//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the `TXPILOT`
//! prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use txpilot::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Listening on {}", config.server.socket_addr());
//! ```

mod builder;
mod error;
mod features;
mod market;
mod nlu;
mod server;
mod session;

pub use builder::BuilderConfig;
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use market::MarketConfig;
pub use nlu::NluConfig;
pub use server::{Environment, ServerConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Language-understanding service configuration
    #[serde(default)]
    pub nlu: NluConfig,

    /// Market-data/ranking service configuration
    #[serde(default)]
    pub market: MarketConfig,

    /// Transaction-construction service configuration
    pub builder: BuilderConfig,

    /// Session store configuration (TTL, eviction cadence)
    #[serde(default)]
    pub session: SessionConfig,

    /// Feature flags (deterministic mocks for the data services)
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// 1. Loads `.env` if present (development)
    /// 2. Reads environment variables with the `TXPILOT` prefix
    /// 3. Uses `__` to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `TXPILOT__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `TXPILOT__BUILDER__BASE_URL=...` -> `builder.base_url = ...`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("TXPILOT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values.
    ///
    /// Mock-mode flags relax the credential requirements of the two data
    /// services; the builder URL is always required.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.nlu.validate(&self.features)?;
        self.market.validate()?;
        self.builder.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Check if running in production environment.
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("TXPILOT__BUILDER__BASE_URL", "https://builder.test.local");
        env::set_var("TXPILOT__NLU__API_KEY", "sk-test-xxx");
    }

    fn clear_env() {
        env::remove_var("TXPILOT__BUILDER__BASE_URL");
        env::remove_var("TXPILOT__NLU__API_KEY");
        env::remove_var("TXPILOT__SERVER__PORT");
        env::remove_var("TXPILOT__SERVER__ENVIRONMENT");
        env::remove_var("TXPILOT__FEATURES__MOCK_EXTRACTOR");
        env::remove_var("TXPILOT__FEATURES__MOCK_MARKET");
        env::remove_var("TXPILOT__NLU__CONFIDENCE_THRESHOLD");
    }

    #[test]
    fn loads_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.builder.base_url, "https://builder.test.local");
    }

    #[test]
    fn minimal_config_validates() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn server_defaults_apply() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn mock_flags_relax_nlu_credentials() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("TXPILOT__BUILDER__BASE_URL", "https://builder.test.local");
        env::set_var("TXPILOT__FEATURES__MOCK_EXTRACTOR", "true");
        env::set_var("TXPILOT__FEATURES__MOCK_MARKET", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert!(config.features.mock_extractor);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn custom_threshold_is_read() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("TXPILOT__NLU__CONFIDENCE_THRESHOLD", "0.8");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.nlu.confidence_threshold, 0.8);
    }
}
