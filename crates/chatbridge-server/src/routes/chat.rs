//! Chat route: one caller message in, one assistant reply out.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chatbridge_core::{Delivery, IdentityHint, MessageRequest, OrchestrationError, ThreadId};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Create chat router
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(send_message))
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "identity")]
    pub telegram_id: Option<IdentityHint>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub thread_id: Option<ThreadId>,
}

impl From<ChatRequest> for MessageRequest {
    fn from(req: ChatRequest) -> Self {
        MessageRequest {
            identity: req.telegram_id,
            content: req.content,
            model: req.model,
            thread_id: req.thread_id,
        }
    }
}

/// Error body returned to callers: `{"error": ..., "kind": ...}`
#[derive(Debug)]
pub enum ApiError {
    Orchestration(OrchestrationError),
    /// Body was not valid JSON for a chat request
    InvalidBody(JsonRejection),
}

impl From<OrchestrationError> for ApiError {
    fn from(err: OrchestrationError) -> Self {
        ApiError::Orchestration(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, kind) = match self {
            ApiError::Orchestration(err) => {
                let status = StatusCode::from_u16(err.status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, err.detail(), err.kind())
            }
            ApiError::InvalidBody(rejection) => {
                (rejection.status(), rejection.body_text(), "INVALID_REQUEST")
            }
        };

        (status, Json(json!({ "error": error, "kind": kind }))).into_response()
    }
}

/// Orchestrate one caller message
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Delivery>, ApiError> {
    let Json(req) = payload.map_err(ApiError::InvalidBody)?;
    let _in_flight = state.track_request();

    let delivery = state.orchestrator.handle_message(req.into()).await?;
    Ok(Json(delivery))
}
