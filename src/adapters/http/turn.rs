//! Inbound-turn route.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::TurnService;
use crate::domain::foundation::{SessionKey, Timestamp};

/// Shared state for the turn routes.
#[derive(Clone)]
pub struct TurnAppState {
    pub turns: Arc<TurnService>,
}

/// Creates the router: `POST /turns` plus a health probe.
pub fn turn_router(state: TurnAppState) -> Router {
    Router::new()
        .route("/turns", post(handle_turn))
        .route("/health", get(health))
        .with_state(state)
}

/// One inbound message.
#[derive(Debug, Deserialize)]
struct TurnRequest {
    session_key: String,
    utterance: String,
}

/// The single outbound message.
#[derive(Debug, Serialize)]
struct TurnResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

async fn handle_turn(
    State(state): State<TurnAppState>,
    Json(request): Json<TurnRequest>,
) -> Response {
    let key = match SessionKey::new(request.session_key) {
        Ok(key) => key,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    };

    let message = state
        .turns
        .handle_turn(&key, &request.utterance, Timestamp::now())
        .await;

    (StatusCode::OK, Json(TurnResponse { message })).into_response()
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_request_deserializes() {
        let request: TurnRequest = serde_json::from_str(
            r#"{"session_key": "chat-1", "utterance": "send 5 USDC to alice.sol"}"#,
        )
        .unwrap();

        assert_eq!(request.session_key, "chat-1");
        assert_eq!(request.utterance, "send 5 USDC to alice.sol");
    }

    #[test]
    fn turn_response_serializes() {
        let json = serde_json::to_string(&TurnResponse {
            message: "done".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"message":"done"}"#);
    }
}
