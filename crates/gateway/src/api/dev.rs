//! Test-fixture seeding (C9 supplemental).
//!
//! Replaces the source's cheat-code string matching inside the chat
//! handler (magic words that jumped a session to a particular step) with
//! an explicit endpoint gated behind `server.dev_mode`. Never reachable
//! in a production configuration — `cli/config.rs` validation rejects
//! `dev_mode = true` without a bearer token configured, and the route is
//! registered only when the flag is set (see `api::router`).

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};

use reg_sessions::{AgentName, SessionMetadata, Turn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SeedSessionRequest {
    pub session_id: String,
    #[serde(default)]
    pub agent: Option<AgentName>,
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
    /// Transcript to replay as user/assistant turns, in order.
    #[serde(default)]
    pub turns: Vec<SeedTurn>,
}

#[derive(Debug, Deserialize)]
pub struct SeedTurn {
    pub role: SeedRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedRole {
    User,
    Assistant,
}

#[derive(Debug, Serialize)]
pub struct SeedSessionResponse {
    pub session_id: String,
    pub agent: String,
    pub step: Option<u32>,
}

pub async fn seed_session(State(state): State<AppState>, Json(req): Json<SeedSessionRequest>) -> impl IntoResponse {
    state.sessions.clear(&req.session_id);
    state.sessions.get_or_create(&req.session_id);

    let agent = req.agent.unwrap_or(AgentName::Orchestrator);
    state.sessions.set_agent(&req.session_id, agent);
    state.sessions.set_step(&req.session_id, req.step);
    if let Some(metadata) = req.metadata {
        state.sessions.inject_metadata(&req.session_id, metadata);
    }

    for turn in req.turns {
        let appended = match turn.role {
            SeedRole::User => Turn::user(turn.content),
            SeedRole::Assistant => Turn::assistant(turn.content, agent),
        };
        state.sessions.append(&req.session_id, appended);
    }

    Json(SeedSessionResponse {
        session_id: req.session_id,
        agent: agent.as_str().to_string(),
        step: req.step,
    })
}
