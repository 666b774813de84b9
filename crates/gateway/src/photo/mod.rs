//! Async photo pipeline (C8).
//!
//! `POST /upload-async` hands bytes off to this module and returns
//! immediately; a bounded worker pool decodes, crops, and re-encodes the
//! image, runs an LLM vision plausibility check, and persists the result.
//! The status store is a single coarse lock, not per-session locking —
//! writes are brief and a second upload for the same session is meant to
//! supersede the first outright.

mod optimize;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use reg_domain::tool::{ContentPart, Message, MessageContent, Role};
use reg_domain::trace::TraceEvent;

use crate::state::AppState;

pub use optimize::optimize;

#[derive(Debug, Clone)]
struct UploadJob {
    complete: bool,
    error: bool,
    response: String,
    last_agent: Option<String>,
    routine_number: Option<u32>,
    updated_at: DateTime<Utc>,
    generation: u64,
}

impl UploadJob {
    fn pending(generation: u64, last_agent: Option<String>, routine_number: Option<u32>) -> Self {
        Self {
            complete: false,
            error: false,
            response: String::new(),
            last_agent,
            routine_number,
            updated_at: Utc::now(),
            generation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadStatus {
    pub complete: bool,
    pub error: bool,
    pub response: Option<String>,
    pub last_agent: Option<String>,
    pub routine_number: Option<u32>,
}

/// Keyed by session id, per spec. One coarse lock; held only briefly.
#[derive(Default)]
pub struct UploadJobStore {
    jobs: Mutex<HashMap<String, UploadJob>>,
}

impl UploadJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new job for a session, superseding any job already running
    /// for it. Returns the new job's generation and the superseded job id
    /// (always the same session id, present only if one was in flight).
    fn start(&self, session_id: &str, last_agent: Option<String>, routine_number: Option<u32>) -> (u64, bool) {
        let mut jobs = self.jobs.lock();
        let superseded = jobs.get(session_id).map(|j| !j.complete).unwrap_or(false);
        let generation = jobs.get(session_id).map(|j| j.generation + 1).unwrap_or(1);
        jobs.insert(session_id.to_string(), UploadJob::pending(generation, last_agent, routine_number));
        (generation, superseded)
    }

    fn complete_success(&self, session_id: &str, generation: u64, response: String) {
        let mut jobs = self.jobs.lock();
        if let Some(job) = jobs.get_mut(session_id) {
            if job.generation == generation {
                job.complete = true;
                job.error = false;
                job.response = response;
                job.updated_at = Utc::now();
            }
        }
    }

    fn complete_error(&self, session_id: &str, generation: u64, message: String) {
        let mut jobs = self.jobs.lock();
        if let Some(job) = jobs.get_mut(session_id) {
            if job.generation == generation {
                job.complete = true;
                job.error = true;
                job.response = message;
                job.updated_at = Utc::now();
            }
        }
    }

    pub fn status(&self, session_id: &str) -> Option<UploadStatus> {
        let jobs = self.jobs.lock();
        jobs.get(session_id).map(|job| UploadStatus {
            complete: job.complete,
            error: job.error,
            response: if job.response.is_empty() { None } else { Some(job.response.clone()) },
            last_agent: job.last_agent.clone(),
            routine_number: job.routine_number,
        })
    }
}

pub struct AcceptedUpload {
    pub response: String,
    pub superseded: bool,
}

/// Accept an upload: record a pending job and hand the bytes to the
/// worker pool. Returns immediately; the caller polls `/upload-status`.
pub fn accept_upload(
    state: AppState,
    session_id: String,
    bytes: Vec<u8>,
    content_type: String,
    last_agent: Option<String>,
    routine_number: Option<u32>,
) -> AcceptedUpload {
    let (generation, superseded) = state.uploads.start(&session_id, last_agent, routine_number);

    TraceEvent::UploadAccepted {
        session_id: session_id.clone(),
        job_id: format!("{session_id}#{generation}"),
        superseded_job_id: if superseded { Some(session_id.clone()) } else { None },
    }
    .emit();

    tokio::spawn(run_worker(state, session_id, generation, bytes, content_type));

    AcceptedUpload {
        response: "Thanks — we're reviewing your photo now. This usually takes a few seconds.".to_string(),
        superseded,
    }
}

async fn run_worker(state: AppState, session_id: String, generation: u64, bytes: Vec<u8>, content_type: String) {
    let Ok(_permit) = state.photo_workers.clone().acquire_owned().await else {
        state
            .uploads
            .complete_error(&session_id, generation, "photo worker pool is shutting down".into());
        return;
    };

    let outcome = process_upload(&state, &session_id, &bytes, &content_type).await;

    match outcome {
        Ok(success_text) => state.uploads.complete_success(&session_id, generation, success_text),
        Err(message) => state.uploads.complete_error(&session_id, generation, message),
    }

    TraceEvent::UploadCompleted { job_id: format!("{session_id}#{generation}"), success: true }.emit();
}

async fn process_upload(state: &AppState, session_id: &str, bytes: &[u8], content_type: &str) -> Result<String, String> {
    let jpeg = optimize::optimize(bytes, content_type)?;

    vision_plausibility_check(state, &jpeg).await?;

    let record_id = record_id_for_session(state, session_id)
        .ok_or_else(|| "could not determine which registration record this photo belongs to".to_string())?;

    let key = format!("{session_id}-{generation}.jpg", generation = Utc::now().timestamp_millis());
    let url = state
        .adapters
        .storage
        .put_image(jpeg, &key, "image/jpeg")
        .await
        .map_err(|e| e.to_string())?;

    state
        .adapters
        .database
        .write_photo_url(&record_id, &url)
        .await
        .map_err(|e| e.to_string())?;

    Ok("Your photo has been received and registration is now complete.".to_string())
}

fn record_id_for_session(state: &AppState, session_id: &str) -> Option<String> {
    let session = state.sessions.get(session_id)?;
    session.turns.iter().rev().find_map(|t| {
        let is_record_write = matches!(
            t.tool_name.as_deref(),
            Some("write-registration") | Some("copy-record-to-current-season")
        );
        if !is_record_write {
            return None;
        }
        t.tool_result
            .as_ref()
            .and_then(|r| r.get("content"))
            .and_then(|c| c.as_str())
            .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
            .and_then(|v| v.get("record_id").and_then(|id| id.as_str()).map(str::to_string))
    })
}

async fn vision_plausibility_check(state: &AppState, jpeg: &[u8]) -> Result<(), String> {
    let Some(provider) = state.llm.for_role("new_registration") else {
        tracing::warn!("no LLM provider configured for the photo plausibility check, accepting unconditionally");
        return Ok(());
    };
    let model = state.llm.model_for_role("new_registration").map(str::to_string);

    let data_url = format!("data:image/jpeg;base64,{}", base64_encode(jpeg));
    let message = Message {
        role: Role::User,
        content: MessageContent::Parts(vec![
            ContentPart::Text {
                text: "Is this a plausible passport-style photo of a child or young person, \
                       suitable for a sports club registration record? Reply with exactly this \
                       JSON object: {\"accept\": boolean, \"reason\": string}."
                    .to_string(),
            },
            ContentPart::Image { url: data_url, media_type: Some("image/jpeg".to_string()) },
        ]),
    };

    let deadline = Duration::from_secs(state.config.tools.client_timeout_secs);
    let resp = crate::llm_invoker::invoke(provider.as_ref(), model, vec![message], Vec::new(), deadline)
        .await
        .map_err(|e| e.to_string())?;

    #[derive(serde::Deserialize)]
    struct Verdict {
        accept: bool,
        #[serde(default)]
        reason: String,
    }
    match serde_json::from_str::<Verdict>(resp.content.trim()) {
        Ok(v) if v.accept => Ok(()),
        Ok(v) => Err(if v.reason.is_empty() {
            "the uploaded photo was not accepted".to_string()
        } else {
            v.reason
        }),
        Err(_) => {
            tracing::warn!("vision plausibility check returned an unparseable reply, accepting unconditionally");
            Ok(())
        }
    }
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn worker_pool(size: usize) -> Arc<tokio::sync::Semaphore> {
    Arc::new(tokio::sync::Semaphore::new(size.max(2)))
}
