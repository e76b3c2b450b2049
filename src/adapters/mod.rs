//! Adapters - Implementations of port interfaces.
//!
//! - `nlu` - language-understanding clients (HTTP + deterministic mock)
//! - `market` - market-data/ranking clients (HTTP with TTL cache + mock)
//! - `builder` - transaction-construction clients (HTTP + scriptable mock)
//! - `storage` - in-memory session repository with TTL eviction
//! - `http` - the thin inbound-turn route for the transport layer

pub mod builder;
pub mod http;
pub mod market;
pub mod nlu;
pub mod storage;
