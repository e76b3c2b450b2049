//! Transaction-construction adapters.

mod http_builder;
mod mock_builder;

pub use http_builder::{HttpBuilderConfig, HttpTransactionBuilder};
pub use mock_builder::{MockTransactionBuilder, Tamper};
