//! Feature flags.
//!
//! The two external data services (language understanding, market data) can
//! be swapped for deterministic mocks at wiring time; used in testing and
//! local development.

use serde::Deserialize;

/// Feature flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureFlags {
    /// Substitute the deterministic mock for the language-understanding
    /// service.
    #[serde(default)]
    pub mock_extractor: bool,

    /// Substitute the deterministic mock for the market-data service.
    #[serde(default)]
    pub mock_market: bool,
}
