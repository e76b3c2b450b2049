//! TransactionBuilder port - the external transaction-construction service.
//!
//! The orchestrator sends a fully-resolved [`ActionRequest`] and receives the
//! builder's raw payload back. The payload is *not* trusted here: the
//! orchestrator re-validates every economically material field against the
//! request before an ActionResult exists at all.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::orchestrator::ActionRequest;

/// Port for the transaction-construction service.
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    /// Asks the service to construct an unsigned transaction for `request`.
    async fn build(&self, request: &ActionRequest) -> Result<BuilderPayload, BuilderError>;
}

/// The raw, unvalidated response from the builder.
///
/// Echoed economic fields are compared against the originating request;
/// `reference` stays opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderPayload {
    /// Opaque unsigned-transaction reference the wallet layer can consume.
    pub reference: String,
    /// Chain identifier of the primary asset.
    pub asset: String,
    /// Amount, echoed for validation. Absent for amount-less variants.
    pub amount: Option<Decimal>,
    /// Destination address, echoed for validation.
    pub destination: Option<String>,
    /// Counter asset identifier for swaps.
    pub counter_asset: Option<String>,
    /// The proposal is only signable until this instant.
    pub expires_at: Timestamp,
}

/// Transaction-construction service errors.
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// The service rejected the request as invalid. Never retried.
    #[error("builder rejected request: {reason}")]
    Rejected { reason: String },

    /// Service is unavailable.
    #[error("builder unavailable: {message}")]
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

impl BuilderError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

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

impl super::Retryable for BuilderError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            BuilderError::Unavailable { .. }
                | BuilderError::Network(_)
                | BuilderError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Retryable;

    #[test]
    fn validation_rejections_are_never_retryable() {
        assert!(!BuilderError::rejected("unknown asset").is_retryable());
        assert!(!BuilderError::malformed("truncated body").is_retryable());
    }

    #[test]
    fn transport_failures_are_retryable() {
        assert!(BuilderError::unavailable("503").is_retryable());
        assert!(BuilderError::network("reset").is_retryable());
        assert!(BuilderError::Timeout { timeout_secs: 10 }.is_retryable());
    }
}
