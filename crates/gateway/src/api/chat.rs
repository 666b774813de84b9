//! Chat entry point (C9).
//!
//! A single non-streaming endpoint: classify, route, run one workflow
//! turn, and return the reply. Errors from the workflow engine are
//! surfaced as a normal 200 response carrying an apologetic assistant
//! turn, never as an HTTP error — only malformed requests (missing
//! fields) get a 4xx.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::workflow;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_message: String,
    pub session_id: String,
    #[serde(default)]
    pub last_agent: Option<String>,
    #[serde(default)]
    pub routine_number: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routine_number: Option<u32>,
    pub session_id: String,
}

pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    if req.session_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "session_id is required" })),
        )
            .into_response();
    }
    if req.user_message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "user_message is required" })),
        )
            .into_response();
    }

    let _permit = match state.session_locks.acquire(&req.session_id).await {
        Ok(permit) => permit,
        Err(_busy) => {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": "session is busy — a turn is already in progress" })),
            )
                .into_response();
        }
    };

    let reply = match workflow::run_turn(&state, &req.session_id, &req.user_message).await {
        Ok(outcome) => ChatResponse {
            response: outcome.reply,
            last_agent: Some(outcome.agent.as_str().to_string()),
            routine_number: outcome.step,
            session_id: req.session_id.clone(),
        },
        Err(e) => {
            tracing::warn!(session_id = %req.session_id, error = %e, "workflow turn failed");
            let session = state.sessions.get(&req.session_id);
            ChatResponse {
                response: format!(
                    "Sorry, something went wrong on our end ({e}). Please try again, or email support if it keeps happening."
                ),
                last_agent: session.as_ref().map(|s| s.agent.as_str().to_string()),
                routine_number: session.and_then(|s| s.step),
                session_id: req.session_id.clone(),
            }
        }
    };

    Json(reply).into_response()
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
    pub session_id: String,
}

pub async fn clear_session(
    State(state): State<AppState>,
    axum::extract::Path(session_id): axum::extract::Path<String>,
) -> impl IntoResponse {
    state.sessions.clear(&session_id);
    Json(ClearResponse { cleared: true, session_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_deserializes_without_optional_fields() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"user_message": "hello", "session_id": "s1"}"#,
        )
        .unwrap();
        assert_eq!(req.user_message, "hello");
        assert!(req.last_agent.is_none());
        assert!(req.routine_number.is_none());
    }
}
