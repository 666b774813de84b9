//! Photo upload endpoints (C9 surface over C8).
//!
//! `POST /upload-async` accepts the multipart body, validates size and
//! MIME type at the transport layer, and hands the bytes to the photo
//! pipeline, which runs on its own worker pool. `GET /upload-status/:id`
//! polls the result.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::photo;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const ACCEPTED_MIME_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/heic"];

#[derive(Debug, Serialize)]
pub struct UploadAcceptedResponse {
    pub response: String,
    pub processing: bool,
    pub session_id: String,
}

#[derive(Default)]
struct ParsedUpload {
    session_id: Option<String>,
    last_agent: Option<String>,
    routine_number: Option<u32>,
    file_bytes: Option<Vec<u8>>,
    content_type: Option<String>,
}

pub async fn upload_async(State(state): State<AppState>, mut multipart: Multipart) -> impl IntoResponse {
    let mut parsed = ParsedUpload::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("malformed multipart body: {e}") })),
                )
                    .into_response();
            }
        };

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                let bytes = match field.bytes().await {
                    Ok(b) => b,
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(serde_json::json!({ "error": format!("could not read file field: {e}") })),
                        )
                            .into_response();
                    }
                };
                if bytes.len() > MAX_UPLOAD_BYTES {
                    return (
                        StatusCode::PAYLOAD_TOO_LARGE,
                        Json(serde_json::json!({
                            "error": format!(
                                "photo exceeds the {MAX_UPLOAD_BYTES} byte limit (received {} bytes)",
                                bytes.len()
                            )
                        })),
                    )
                        .into_response();
                }
                parsed.content_type = Some(content_type);
                parsed.file_bytes = Some(bytes.to_vec());
            }
            "session_id" => parsed.session_id = field.text().await.ok(),
            "last_agent" => parsed.last_agent = field.text().await.ok().filter(|s| !s.is_empty()),
            "routine_number" => {
                parsed.routine_number = field.text().await.ok().and_then(|s| s.parse::<u32>().ok());
            }
            _ => {}
        }
    }

    let Some(session_id) = parsed.session_id.filter(|s| !s.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "session_id is required" })))
            .into_response();
    };
    let Some(file_bytes) = parsed.file_bytes else {
        return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "file is required" })))
            .into_response();
    };
    let content_type = parsed.content_type.unwrap_or_default();
    if !ACCEPTED_MIME_TYPES.contains(&content_type.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!(
                    "unsupported image type \"{content_type}\"; accepted types are {}",
                    ACCEPTED_MIME_TYPES.join(", ")
                )
            })),
        )
            .into_response();
    }

    let accepted = photo::accept_upload(
        state,
        session_id.clone(),
        file_bytes,
        content_type,
        parsed.last_agent,
        parsed.routine_number,
    );

    Json(UploadAcceptedResponse {
        response: accepted.response,
        processing: true,
        session_id,
    })
    .into_response()
}

#[derive(Debug, Serialize)]
pub struct UploadStatusResponse {
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routine_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusPath {
    session_id: String,
}

pub async fn upload_status(State(state): State<AppState>, Path(params): Path<StatusPath>) -> impl IntoResponse {
    match state.uploads.status(&params.session_id) {
        Some(status) => Json(UploadStatusResponse {
            complete: status.complete,
            response: status.response,
            error: Some(status.error),
            last_agent: status.last_agent,
            routine_number: status.routine_number,
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "no upload job found for this session" })),
        )
            .into_response(),
    }
}
