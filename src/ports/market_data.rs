//! MarketDataProvider port - symbol-to-identifier ranking lookups.
//!
//! The resolver disambiguates token symbols through this port; the composer's
//! ranking reports come from it too. Responses are ordered by ascending market
//! rank and implementations are expected to cache the ranking universe with a
//! bounded TTL, shared read-only across sessions.

use async_trait::async_trait;

use crate::domain::intent::{TimeWindow, TokenCandidate};

/// Port for the market-data/ranking service.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Case-insensitive symbol lookup. Returns every listing whose symbol
    /// matches, ordered by ascending rank; empty when nothing matches.
    async fn lookup_symbol(&self, query: &str) -> Result<Vec<TokenCandidate>, MarketError>;

    /// The top `limit` listings over `window`, ordered by ascending rank.
    async fn top_ranked(
        &self,
        limit: u32,
        window: TimeWindow,
    ) -> Result<Vec<TokenCandidate>, MarketError>;
}

/// Market-data service errors.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },
}

impl MarketError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}

impl super::Retryable for MarketError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            MarketError::RateLimited { .. }
                | MarketError::Unavailable { .. }
                | MarketError::Network(_)
                | MarketError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Retryable;

    #[test]
    fn retryable_classification() {
        assert!(MarketError::unavailable("down").is_retryable());
        assert!(MarketError::network("reset").is_retryable());
        assert!(MarketError::Timeout { timeout_secs: 5 }.is_retryable());
        assert!(!MarketError::malformed("truncated").is_retryable());
    }
}
