//! HTTP market-data client with a shared TTL cache.
//!
//! Pulls the ranking universe once per window and serves symbol lookups from
//! the cached copy. The cache is bounded, TTL-refreshed, and read-shared
//! across sessions. A stale copy is served if a refresh fails while one
//! exists.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

use crate::domain::intent::{TimeWindow, TokenCandidate};
use crate::ports::{MarketDataProvider, MarketError};

/// Configuration for the HTTP market provider.
#[derive(Debug, Clone)]
pub struct HttpMarketConfig {
    /// Base URL of the ranking API.
    pub base_url: String,
    /// Optional API key, sent as `X-API-KEY`.
    api_key: Option<Secret<String>>,
    /// Request timeout.
    pub timeout: Duration,
    /// How long a fetched universe stays fresh.
    pub cache_ttl: Duration,
    /// Listings pulled per refresh.
    pub universe_limit: u32,
}

impl HttpMarketConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(3600),
            universe_limit: 250,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_universe_limit(mut self, limit: u32) -> Self {
        self.universe_limit = limit;
        self
    }
}

struct CacheEntry {
    fetched_at: Instant,
    listings: Vec<TokenCandidate>,
}

/// Ranking client. One cached universe per time window.
pub struct HttpMarketProvider {
    config: HttpMarketConfig,
    client: Client,
    cache: RwLock<HashMap<TimeWindow, CacheEntry>>,
}

impl HttpMarketProvider {
    pub fn new(config: HttpMarketConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self {
            config,
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn listings_url(&self, window: TimeWindow) -> String {
        let window = match window {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
        };
        format!(
            "{}/cryptocurrency/listings/latest?limit={}&window={}",
            self.config.base_url, self.config.universe_limit, window
        )
    }

    /// The ranked universe for `window`, from cache when fresh.
    async fn universe(&self, window: TimeWindow) -> Result<Vec<TokenCandidate>, MarketError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&window) {
                if entry.fetched_at.elapsed() < self.config.cache_ttl {
                    return Ok(entry.listings.clone());
                }
            }
        }

        match self.fetch_universe(window).await {
            Ok(listings) => {
                let mut cache = self.cache.write().await;
                cache.insert(
                    window,
                    CacheEntry {
                        fetched_at: Instant::now(),
                        listings: listings.clone(),
                    },
                );
                Ok(listings)
            }
            Err(err) => {
                // Serve the stale copy rather than failing the turn.
                let cache = self.cache.read().await;
                if let Some(entry) = cache.get(&window) {
                    warn!(error = %err, "ranking refresh failed; serving stale cache");
                    return Ok(entry.listings.clone());
                }
                Err(err)
            }
        }
    }

    async fn fetch_universe(&self, window: TimeWindow) -> Result<Vec<TokenCandidate>, MarketError> {
        let mut request = self.client.get(self.listings_url(window));
        if let Some(key) = &self.config.api_key {
            request = request.header("X-API-KEY", key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketError::Timeout {
                    timeout_secs: self.config.timeout.as_secs() as u32,
                }
            } else if e.is_connect() {
                MarketError::network(format!("connection failed: {}", e))
            } else {
                MarketError::network(e.to_string())
            }
        })?;

        let response = handle_status(response).await?;
        let body: ListingsResponse = response
            .json()
            .await
            .map_err(|e| MarketError::malformed(format!("undecodable body: {}", e)))?;

        let mut listings: Vec<TokenCandidate> = body
            .data
            .into_iter()
            .map(|dto| TokenCandidate::new(dto.slug, dto.symbol, dto.name, dto.rank))
            .collect();
        listings.sort_by_key(|t| t.rank);
        Ok(listings)
    }
}

async fn handle_status(response: Response) -> Result<Response, MarketError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match status.as_u16() {
        429 => Err(MarketError::RateLimited {
            retry_after_secs: 60,
        }),
        500..=599 => Err(MarketError::unavailable(format!(
            "server error {}: {}",
            status, body
        ))),
        _ => Err(MarketError::network(format!(
            "unexpected status {}: {}",
            status, body
        ))),
    }
}

#[async_trait]
impl MarketDataProvider for HttpMarketProvider {
    async fn lookup_symbol(&self, query: &str) -> Result<Vec<TokenCandidate>, MarketError> {
        let universe = self.universe(TimeWindow::Day).await?;
        Ok(universe
            .into_iter()
            .filter(|t| t.symbol.eq_ignore_ascii_case(query))
            .collect())
    }

    async fn top_ranked(
        &self,
        limit: u32,
        window: TimeWindow,
    ) -> Result<Vec<TokenCandidate>, MarketError> {
        let universe = self.universe(window).await?;
        Ok(universe.into_iter().take(limit as usize).collect())
    }
}

// Wire types.

#[derive(Debug, Deserialize)]
struct ListingsResponse {
    data: Vec<ListingDto>,
}

#[derive(Debug, Deserialize)]
struct ListingDto {
    slug: String,
    symbol: String,
    name: String,
    #[serde(alias = "cmc_rank")]
    rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_works() {
        let config = HttpMarketConfig::new("https://rankings.internal/v1")
            .with_api_key("key-123")
            .with_timeout(Duration::from_secs(3))
            .with_cache_ttl(Duration::from_secs(60))
            .with_universe_limit(50);

        assert_eq!(config.base_url, "https://rankings.internal/v1");
        assert_eq!(config.universe_limit, 50);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn listings_url_includes_limit_and_window() {
        let provider = HttpMarketProvider::new(
            HttpMarketConfig::new("https://rankings.internal/v1").with_universe_limit(100),
        );

        assert_eq!(
            provider.listings_url(TimeWindow::Week),
            "https://rankings.internal/v1/cryptocurrency/listings/latest?limit=100&window=week"
        );
    }

    #[test]
    fn listings_parse_with_either_rank_field() {
        let body = r#"{"data": [
            {"slug": "solana", "symbol": "SOL", "name": "Solana", "cmc_rank": 5},
            {"slug": "usd-coin", "symbol": "USDC", "name": "USD Coin", "rank": 6}
        ]}"#;

        let parsed: ListingsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].rank, 5);
        assert_eq!(parsed.data[1].rank, 6);
    }
}
