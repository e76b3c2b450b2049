//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between the
//! pipeline and the outside world; adapters implement them.
//!
//! - `IntentExtractor` - structured extraction via the language-understanding service
//! - `MarketDataProvider` - symbol-to-identifier ranking lookups
//! - `TransactionBuilder` - the external transaction-construction service
//! - `SessionRepository` - keyed session state with per-key exclusivity
//! - `RetryPolicy` - the one timeout + bounded-retry primitive every
//!   integration goes through

mod intent_extractor;
mod market_data;
mod retry;
mod session_repository;
mod tx_builder;

pub use intent_extractor::{
    ExtractionReply, ExtractionRequest, ExtractorError, HistoryRole, HistoryTurn, IntentExtractor,
};
pub use market_data::{MarketDataProvider, MarketError};
pub use retry::{RetryError, RetryPolicy, Retryable};
pub use session_repository::{SessionGuard, SessionRepository};
pub use tx_builder::{BuilderError, BuilderPayload, TransactionBuilder};
