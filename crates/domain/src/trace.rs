use serde::Serialize;

/// Structured lifecycle events emitted across the registration gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: String,
    },
    RouteClassified {
        session_id: String,
        track: String,
        matched_code: bool,
    },
    StepAdvanced {
        session_id: String,
        agent: String,
        from_step: Option<u32>,
        to_step: u32,
        server_driven: bool,
    },
    ToolDispatched {
        session_id: String,
        tool_name: String,
        duration_ms: u64,
        is_error: bool,
    },
    LlmRequest {
        provider: String,
        model: String,
        role: String,
        duration_ms: u64,
        attempt: u32,
    },
    UploadAccepted {
        session_id: String,
        job_id: String,
        superseded_job_id: Option<String>,
    },
    UploadCompleted {
        job_id: String,
        success: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "registration_event");
    }
}
