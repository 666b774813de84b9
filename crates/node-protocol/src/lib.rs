//! Wire format for remote tool execution.
//!
//! When an agent's `execution_mode` is `Remote`, the tool registry posts a
//! [`RemoteToolRequest`] to the configured remote tool server instead of
//! running the handler in-process, and expects a [`RemoteToolResponse`]
//! back. This is deliberately a single request/response pair rather than a
//! stateful handshake: there is exactly one remote endpoint per
//! deployment, not a fleet of nodes to negotiate capabilities with.

use serde::{Deserialize, Serialize};

/// Request body posted to the remote tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteToolRequest {
    pub request_id: String,
    pub session_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// Response body the remote tool server returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteToolResponse {
    pub request_id: String,
    pub success: bool,
    pub result: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the result exceeded [`MAX_TOOL_RESPONSE_BYTES`] and was
    /// truncated before being returned.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// Max tool response payload size in bytes (1 MB). Remote tool servers
/// should truncate results exceeding this and set `truncated = true`.
pub const MAX_TOOL_RESPONSE_BYTES: usize = 1024 * 1024;

impl RemoteToolResponse {
    pub fn ok(request_id: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            result,
            error: None,
            truncated: false,
        }
    }

    pub fn err(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            result: serde_json::Value::Null,
            error: Some(message.into()),
            truncated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_has_no_error() {
        let resp = RemoteToolResponse::ok("r1", serde_json::json!({"status": "done"}));
        assert!(resp.success);
        assert!(resp.error.is_none());
    }

    #[test]
    fn err_response_has_null_result() {
        let resp = RemoteToolResponse::err("r1", "boom");
        assert!(!resp.success);
        assert_eq!(resp.result, serde_json::Value::Null);
        assert_eq!(resp.error.as_deref(), Some("boom"));
    }

    #[test]
    fn request_serializes_with_tag_free_shape() {
        let req = RemoteToolRequest {
            request_id: "r1".into(),
            session_id: "s1".into(),
            tool_name: "address-lookup".into(),
            arguments: serde_json::json!({"postcode": "SW1A 1AA"}),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["tool_name"], "address-lookup");
    }
}
