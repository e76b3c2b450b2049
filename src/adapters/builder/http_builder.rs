//! HTTP transaction-construction client.
//!
//! Sends the resolved action to the builder service and returns its raw
//! payload. No validation happens here - the orchestrator compares the
//! echoed economic fields against the request before trusting anything.

use async_trait::async_trait;
use reqwest::{Client, Response};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

use crate::domain::orchestrator::ActionRequest;
use crate::ports::{BuilderError, BuilderPayload, TransactionBuilder};

/// Configuration for the HTTP builder client.
#[derive(Debug, Clone)]
pub struct HttpBuilderConfig {
    /// Base URL of the transaction-construction API.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl HttpBuilderConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP implementation of the builder port.
pub struct HttpTransactionBuilder {
    config: HttpBuilderConfig,
    client: Client,
}

impl HttpTransactionBuilder {
    pub fn new(config: HttpBuilderConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        Self { config, client }
    }

    fn actions_url(&self) -> String {
        format!("{}/v1/actions", self.config.base_url)
    }

    async fn handle_status(&self, response: Response) -> Result<Response, BuilderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            // Validation rejections are final; the orchestrator never
            // retries them.
            400 | 422 => Err(BuilderError::rejected(body)),
            500..=599 => Err(BuilderError::unavailable(format!(
                "server error {}: {}",
                status, body
            ))),
            _ => Err(BuilderError::network(format!(
                "unexpected status {}: {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl TransactionBuilder for HttpTransactionBuilder {
    async fn build(&self, request: &ActionRequest) -> Result<BuilderPayload, BuilderError> {
        let dto = BuildRequestDto::from(request);

        let response = self
            .client
            .post(self.actions_url())
            .header("Content-Type", "application/json")
            .json(&dto)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BuilderError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    BuilderError::network(format!("connection failed: {}", e))
                } else {
                    BuilderError::network(e.to_string())
                }
            })?;

        let response = self.handle_status(response).await?;
        response
            .json::<BuilderPayload>()
            .await
            .map_err(|e| BuilderError::malformed(format!("undecodable body: {}", e)))
    }
}

/// Wire form of an action request.
#[derive(Debug, Serialize)]
struct BuildRequestDto {
    action_id: String,
    kind: String,
    asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    counter_asset: Option<String>,
}

impl From<&ActionRequest> for BuildRequestDto {
    fn from(request: &ActionRequest) -> Self {
        let fields = request.fields();
        Self {
            action_id: request.id().to_string(),
            kind: request.kind().as_str().to_string(),
            asset: fields.asset.clone(),
            amount: fields.amount,
            destination: fields.destination.clone(),
            counter_asset: fields.counter_asset.clone(),
        }
    }
}
