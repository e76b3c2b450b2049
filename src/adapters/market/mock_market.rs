//! Deterministic mock of the market-data/ranking service.
//!
//! A fixed listing table covering the interesting lookup shapes: unique
//! symbols, a case-colliding pair (WIF / Wif), and enough depth for ranking
//! reports. Used under the `mock_market` feature flag and throughout the
//! tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::domain::intent::{TimeWindow, TokenCandidate};
use crate::ports::{MarketDataProvider, MarketError};

/// Static-table market provider.
#[derive(Debug)]
pub struct MockMarketProvider {
    listings: Vec<TokenCandidate>,
    lookups: Mutex<Vec<String>>,
}

impl Default for MockMarketProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketProvider {
    /// The standard table.
    pub fn new() -> Self {
        Self::with_listings(vec![
            TokenCandidate::new("solana", "SOL", "Solana", 5),
            TokenCandidate::new("usd-coin", "USDC", "USD Coin", 6),
            TokenCandidate::new("tether", "USDT", "Tether", 7),
            TokenCandidate::new("bonk", "BONK", "Bonk", 38),
            TokenCandidate::new("dogwifhat", "WIF", "dogwifhat", 41),
            TokenCandidate::new("jupiter", "JUP", "Jupiter", 60),
            TokenCandidate::new("pyth-network", "PYTH", "Pyth Network", 90),
            TokenCandidate::new("wif-classic", "Wif", "Wif Classic", 310),
        ])
    }

    /// A custom table, ranked on insertion.
    pub fn with_listings(mut listings: Vec<TokenCandidate>) -> Self {
        listings.sort_by_key(|t| t.rank);
        Self {
            listings,
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Symbols looked up so far.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketProvider {
    async fn lookup_symbol(&self, query: &str) -> Result<Vec<TokenCandidate>, MarketError> {
        self.lookups.lock().unwrap().push(query.to_string());
        Ok(self
            .listings
            .iter()
            .filter(|t| t.symbol.eq_ignore_ascii_case(query))
            .cloned()
            .collect())
    }

    async fn top_ranked(
        &self,
        limit: u32,
        _window: TimeWindow,
    ) -> Result<Vec<TokenCandidate>, MarketError> {
        Ok(self.listings.iter().take(limit as usize).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn usdc_resolves_uniquely() {
        let market = MockMarketProvider::new();
        let hits = market.lookup_symbol("USDC").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].identifier, "usd-coin");
    }

    #[tokio::test]
    async fn wif_has_two_case_colliding_listings() {
        let market = MockMarketProvider::new();
        let hits = market.lookup_symbol("wif").await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn unknown_symbols_match_nothing() {
        let market = MockMarketProvider::new();
        assert!(market.lookup_symbol("NOPECOIN").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn top_ranked_respects_the_limit_and_order() {
        let market = MockMarketProvider::new();
        let top = market.top_ranked(3, TimeWindow::Day).await.unwrap();
        let symbols: Vec<&str> = top.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SOL", "USDC", "USDT"]);
    }

    #[tokio::test]
    async fn lookups_are_tracked() {
        let market = MockMarketProvider::new();
        market.lookup_symbol("SOL").await.unwrap();
        market.lookup_symbol("USDC").await.unwrap();
        assert_eq!(market.lookups(), vec!["SOL", "USDC"]);
    }
}
