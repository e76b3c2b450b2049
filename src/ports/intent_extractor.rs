//! IntentExtractor port - structured extraction from natural language.
//!
//! Abstracts the language-understanding service. The pipeline sends one
//! utterance plus recent history and a strict output schema; the service
//! either invokes the extraction tool (returning raw arguments the parser
//! validates) or answers conversationally. The port never interprets the
//! arguments - schema validation is the parser's job, so a misbehaving
//! provider can at worst produce an `Unrecognized` turn.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the language-understanding service.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    /// Issues a single structured-extraction call.
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionReply, ExtractorError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// One extraction request.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// The current utterance (text; voice is transcribed upstream).
    pub utterance: String,
    /// Recent conversation turns, oldest first.
    pub history: Vec<HistoryTurn>,
    /// JSON schema the tool arguments must conform to.
    pub schema: serde_json::Value,
}

impl ExtractionRequest {
    pub fn new(utterance: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            utterance: utterance.into(),
            history: Vec::new(),
            schema,
        }
    }

    /// Attaches recent history, oldest first.
    pub fn with_history(mut self, history: Vec<HistoryTurn>) -> Self {
        self.history = history;
        self
    }
}

/// A prior conversation turn, in the provider-agnostic format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub text: String,
}

impl HistoryTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: HistoryRole::Assistant,
            text: text.into(),
        }
    }
}

/// Who spoke a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

/// What the service did with the utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionReply {
    /// The extraction tool was invoked; `arguments` is the raw, unvalidated
    /// argument object.
    ToolCall { arguments: serde_json::Value },
    /// The service answered in prose instead (greeting, small talk).
    Conversational(String),
}

/// Language-understanding service errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u32 },

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable { message: String },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// The HTTP response could not be decoded at all.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u32 },
}

impl ExtractorError {
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
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

impl super::Retryable for ExtractorError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExtractorError::RateLimited { .. }
                | ExtractorError::Unavailable { .. }
                | ExtractorError::Network(_)
                | ExtractorError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::Retryable;

    #[test]
    fn transient_failures_are_retryable() {
        assert!(ExtractorError::rate_limited(30).is_retryable());
        assert!(ExtractorError::unavailable("down").is_retryable());
        assert!(ExtractorError::network("reset").is_retryable());
        assert!(ExtractorError::Timeout { timeout_secs: 10 }.is_retryable());
    }

    #[test]
    fn rejections_are_not_retryable() {
        assert!(!ExtractorError::AuthenticationFailed.is_retryable());
        assert!(!ExtractorError::malformed("not json").is_retryable());
        assert!(!ExtractorError::InvalidRequest("bad schema".into()).is_retryable());
    }

    #[test]
    fn request_builder_attaches_history() {
        let req = ExtractionRequest::new("send 5 USDC", serde_json::json!({}))
            .with_history(vec![HistoryTurn::user("hi"), HistoryTurn::assistant("hello")]);
        assert_eq!(req.history.len(), 2);
        assert_eq!(req.history[0].role, HistoryRole::User);
    }
}
