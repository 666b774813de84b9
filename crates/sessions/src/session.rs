//! Session and turn data model.
//!
//! Kept deliberately separate from `reg_domain::tool::Message` (the
//! provider-wire format): a [`Turn`] is what the session store owns and
//! persists across the life of a conversation, while a `Message` is what
//! gets built from turns for a single LLM call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentName {
    Orchestrator,
    NewRegistration,
    ReRegistration,
}

impl AgentName {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentName::Orchestrator => "orchestrator",
            AgentName::NewRegistration => "new_registration",
            AgentName::ReRegistration => "re_registration",
        }
    }
}

impl std::str::FromStr for AgentName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orchestrator" => Ok(AgentName::Orchestrator),
            "new_registration" => Ok(AgentName::NewRegistration),
            "re_registration" => Ok(AgentName::ReRegistration),
            other => Err(format!("unknown agent name: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
    Tool,
}

/// A single append-only entry in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_arguments: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentName>,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            tool_name: None,
            tool_arguments: None,
            tool_result: None,
            agent: None,
            at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, agent: AgentName) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            tool_name: None,
            tool_arguments: None,
            tool_result: None,
            agent: Some(agent),
            at: Utc::now(),
        }
    }

    pub fn tool(
        tool_name: impl Into<String>,
        tool_arguments: serde_json::Value,
        tool_result: serde_json::Value,
    ) -> Self {
        Self {
            role: TurnRole::Tool,
            content: String::new(),
            tool_name: Some(tool_name.into()),
            tool_arguments: Some(tool_arguments),
            tool_result: Some(tool_result),
            agent: None,
            at: Utc::now(),
        }
    }
}

/// Metadata parsed from a registration code and injected into a session:
/// team, age group, season, and (for re-registration) the player's name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

/// An ongoing conversation. Identified by an opaque session id, created
/// lazily on first contact and never shared across identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub turns: Vec<Turn>,
    pub agent: AgentName,
    /// `None` while chatting with the orchestrator outside a workflow.
    pub step: Option<u32>,
    pub metadata: SessionMetadata,
    /// Consecutive failed re-registration security checks (DOB + postcode).
    #[serde(default)]
    pub security_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            turns: Vec::new(),
            agent: AgentName::Orchestrator,
            step: None,
            metadata: SessionMetadata::default(),
            security_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
