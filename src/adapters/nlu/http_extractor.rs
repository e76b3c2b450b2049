//! HTTP language-understanding client.
//!
//! Talks to an OpenAI-compatible chat-completions API using tool calling:
//! the extraction schema rides along as the single tool's parameter schema,
//! and the model either invokes the tool or answers in prose. The raw tool
//! arguments are passed through untouched - schema validation belongs to the
//! parser, which treats anything non-conformant as `Unrecognized`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ports::{ExtractionReply, ExtractionRequest, ExtractorError, HistoryRole, IntentExtractor};

const EXTRACTION_TOOL_NAME: &str = "extract_intent";

const SYSTEM_PROMPT: &str = "You are a careful transaction assistant. When the user asks to \
    transfer tokens, swap tokens, check a balance, or see token rankings, call the \
    `extract_intent` tool with the intent variant, your confidence, and only the parameters \
    the user actually stated - never invent or default a value the user did not say. If the \
    message is a greeting or not an actionable request, reply conversationally instead.";

/// Configuration for the HTTP extractor.
#[derive(Debug, Clone)]
pub struct HttpExtractorConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model to use.
    pub model: String,
    /// Base URL of the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpExtractorConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI-compatible extractor implementation.
pub struct HttpIntentExtractor {
    config: HttpExtractorConfig,
    client: Client,
}

impl HttpIntentExtractor {
    pub fn new(config: HttpExtractorConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn to_chat_request(&self, request: &ExtractionRequest) -> ChatRequest {
        let mut messages = vec![ChatMessage {
            role: "system".to_string(),
            content: Some(SYSTEM_PROMPT.to_string()),
        }];

        for turn in &request.history {
            messages.push(ChatMessage {
                role: match turn.role {
                    HistoryRole::User => "user",
                    HistoryRole::Assistant => "assistant",
                }
                .to_string(),
                content: Some(turn.text.clone()),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: Some(request.utterance.clone()),
        });

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            tools: vec![ToolSpec {
                kind: "function".to_string(),
                function: FunctionSpec {
                    name: EXTRACTION_TOOL_NAME.to_string(),
                    description: "Extract the user's transaction intent and stated parameters"
                        .to_string(),
                    parameters: request.schema.clone(),
                },
            }],
            tool_choice: "auto".to_string(),
            temperature: 0.0,
        }
    }

    async fn handle_status(&self, response: Response) -> Result<Response, ExtractorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 => Err(ExtractorError::AuthenticationFailed),
            429 => Err(ExtractorError::rate_limited(30)),
            400 => Err(ExtractorError::InvalidRequest(body)),
            500..=599 => Err(ExtractorError::unavailable(format!(
                "server error {}: {}",
                status, body
            ))),
            _ => Err(ExtractorError::network(format!(
                "unexpected status {}: {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl IntentExtractor for HttpIntentExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractionReply, ExtractorError> {
        let chat_request = self.to_chat_request(&request);

        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractorError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    ExtractorError::network(format!("connection failed: {}", e))
                } else {
                    ExtractorError::network(e.to_string())
                }
            })?;

        let response = self.handle_status(response).await?;
        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractorError::malformed(format!("undecodable body: {}", e)))?;

        reply_from_chat(chat)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Maps the chat response into the port's reply type.
fn reply_from_chat(chat: ChatResponse) -> Result<ExtractionReply, ExtractorError> {
    let choice = chat
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ExtractorError::malformed("no choices in response"))?;

    if let Some(call) = choice.message.tool_calls.unwrap_or_default().into_iter().next() {
        if call.function.name != EXTRACTION_TOOL_NAME {
            return Err(ExtractorError::malformed(format!(
                "unexpected tool '{}'",
                call.function.name
            )));
        }
        let arguments = serde_json::from_str(&call.function.arguments)
            .map_err(|e| ExtractorError::malformed(format!("tool arguments not JSON: {}", e)))?;
        return Ok(ExtractionReply::ToolCall { arguments });
    }

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => {
            Ok(ExtractionReply::Conversational(content.trim().to_string()))
        }
        _ => Err(ExtractorError::malformed("neither tool call nor content")),
    }
}

// Wire types.

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    tools: Vec<ToolSpec>,
    tool_choice: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: String,
    function: FunctionSpec,
}

#[derive(Debug, Serialize)]
struct FunctionSpec {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    function: ResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct ResponseFunctionCall {
    name: String,
    arguments: String,
}
