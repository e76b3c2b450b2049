//! Txpilot server binary.
//!
//! Loads configuration, wires adapters (honoring the mock feature flags),
//! starts the session eviction loop, and serves the inbound-turn route.

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use txpilot::adapters::builder::{HttpBuilderConfig, HttpTransactionBuilder};
use txpilot::adapters::http::{turn_router, TurnAppState};
use txpilot::adapters::market::{HttpMarketConfig, HttpMarketProvider, MockMarketProvider};
use txpilot::adapters::nlu::{HttpExtractorConfig, HttpIntentExtractor, MockIntentExtractor};
use txpilot::adapters::storage::InMemorySessionStore;
use txpilot::application::TurnService;
use txpilot::config::AppConfig;
use txpilot::domain::intent::IntentParser;
use txpilot::domain::orchestrator::TransactionOrchestrator;
use txpilot::domain::resolver::SlotResolver;
use txpilot::ports::{IntentExtractor, MarketDataProvider, RetryPolicy, SessionRepository};

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = config.validate() {
        eprintln!("invalid configuration: {err}");
        std::process::exit(1);
    }

    init_tracing(&config);

    let sessions: Arc<InMemorySessionStore> =
        Arc::new(InMemorySessionStore::new(config.session.ttl()));
    let _eviction = InMemorySessionStore::spawn_eviction_loop(
        sessions.clone(),
        config.session.eviction_interval(),
    );

    let extractor = make_extractor(&config);
    let market = make_market(&config);

    let parser = IntentParser::new(
        extractor,
        RetryPolicy::new(config.nlu.max_attempts, config.nlu.timeout()),
        config.nlu.confidence_threshold,
    );
    let market_retry = RetryPolicy::new(config.market.max_attempts, config.market.timeout());
    let resolver = SlotResolver::new(market.clone(), market_retry.clone(), config.market.tie_break);
    let orchestrator = TransactionOrchestrator::new(
        Arc::new(HttpTransactionBuilder::new(
            HttpBuilderConfig::new(config.builder.base_url.clone())
                .with_timeout(config.builder.timeout()),
        )),
        RetryPolicy::new(config.builder.max_attempts, config.builder.timeout()),
    );

    let turns = Arc::new(TurnService::new(
        sessions as Arc<dyn SessionRepository>,
        parser,
        resolver,
        orchestrator,
        market,
        market_retry,
    ));

    let app = turn_router(TurnAppState { turns }).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(60))),
    );

    let addr = config.server.socket_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(%addr, mock_extractor = config.features.mock_extractor, mock_market = config.features.mock_market, "txpilot listening");

    if let Err(err) = axum::serve(listener, app).await {
        eprintln!("server error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn make_extractor(config: &AppConfig) -> Arc<dyn IntentExtractor> {
    if config.features.mock_extractor {
        info!("using mock language-understanding service");
        return Arc::new(MockIntentExtractor::new());
    }

    // Validation guarantees a key outside mock mode.
    let api_key = config
        .nlu
        .api_key
        .as_ref()
        .map(|key| key.expose_secret().clone())
        .unwrap_or_default();

    Arc::new(HttpIntentExtractor::new(
        HttpExtractorConfig::new(api_key)
            .with_model(config.nlu.model.clone())
            .with_base_url(config.nlu.base_url.clone())
            .with_timeout(config.nlu.timeout()),
    ))
}

fn make_market(config: &AppConfig) -> Arc<dyn MarketDataProvider> {
    if config.features.mock_market {
        info!("using mock market-data service");
        return Arc::new(MockMarketProvider::new());
    }

    let mut market_config = HttpMarketConfig::new(config.market.base_url.clone())
        .with_timeout(config.market.timeout())
        .with_cache_ttl(config.market.cache_ttl())
        .with_universe_limit(config.market.universe_limit);
    if let Some(key) = &config.market.api_key {
        market_config = market_config.with_api_key(key.expose_secret().clone());
    }

    Arc::new(HttpMarketProvider::new(market_config))
}
