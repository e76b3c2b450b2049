//! Market-data/ranking adapters.

mod http_market;
mod mock_market;

pub use http_market::{HttpMarketConfig, HttpMarketProvider};
pub use mock_market::MockMarketProvider;
