//! Language-understanding adapters.

mod http_extractor;
mod mock_extractor;

pub use http_extractor::{HttpExtractorConfig, HttpIntentExtractor};
pub use mock_extractor::MockIntentExtractor;
