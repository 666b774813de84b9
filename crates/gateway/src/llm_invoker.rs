//! LLM invoker (C7).
//!
//! A thin retry/backoff wrapper around `reg_providers::LlmProvider::chat`
//! that enforces the engine's two-field structured reply schema and the
//! canonical retry table: exponential backoff on transient failures (base
//! 1s, factor 2, max 3 attempts), one corrective re-ask on a schema-parse
//! failure, and a per-attempt client-side deadline.

use std::time::Duration;

use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use serde::Deserialize;

use reg_domain::error::{Error, Result};
use reg_domain::tool::{Message, ToolDefinition};
use reg_providers::{ChatRequest, ChatResponse, LlmProvider};

/// The engine's structured reply shape (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredReply {
    pub agent_final_response: String,
    pub routine_number: Option<u32>,
}

const CORRECTIVE_NOTICE: &str = "\
Your previous reply did not parse as the required JSON object \
`{\"agent_final_response\": string, \"routine_number\": integer | null}`. \
Reply again with exactly that shape and nothing else.";

/// Invoke the model with retry, returning both the raw response (for tool
/// calls) and the parsed structured reply when the caller only needs text.
pub async fn invoke(
    provider: &dyn LlmProvider,
    model: Option<String>,
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
    client_deadline: Duration,
) -> Result<ChatResponse> {
    let per_attempt_deadline = client_deadline
        .saturating_sub(Duration::from_secs(2))
        .min(Duration::from_secs(28));

    let backoff_policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_secs(1))
        .with_multiplier(2.0)
        .with_max_elapsed_time(Some(Duration::from_secs(1 + 2 + 4)))
        .build();

    let attempt = move || {
        let req = ChatRequest {
            messages: messages.clone(),
            tools: tools.clone(),
            temperature: None,
            max_tokens: None,
            json_mode: true,
            model: model.clone(),
        };
        async move {
            let call = provider.chat(req);
            match tokio::time::timeout(per_attempt_deadline, call).await {
                Ok(Ok(resp)) => Ok(resp),
                Ok(Err(e)) if is_transient(&e) => Err(backoff::Error::transient(e)),
                Ok(Err(e)) => Err(backoff::Error::permanent(e)),
                Err(_) => Err(backoff::Error::transient(Error::Timeout(
                    "LLM call exceeded the per-attempt deadline".into(),
                ))),
            }
        }
    };

    retry(backoff_policy, attempt).await
}

/// Parse a model's raw text content into the structured reply schema,
/// re-asking once with a corrective message on failure (spec §4.7).
pub async fn invoke_structured(
    provider: &dyn LlmProvider,
    model: Option<String>,
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
    client_deadline: Duration,
) -> Result<(StructuredReply, ChatResponse)> {
    let resp = invoke(provider, model.clone(), messages.clone(), tools.clone(), client_deadline).await?;
    finalize_structured(provider, model, messages, tools, client_deadline, resp).await
}

/// Finish turning an already-obtained response into a structured reply,
/// re-asking once with a corrective message on a schema-parse failure.
/// Lets a caller that has already driven its own tool-dispatch round (the
/// workflow engine) reuse the same corrective-retry behaviour without
/// repeating the first LLM call.
pub async fn finalize_structured(
    provider: &dyn LlmProvider,
    model: Option<String>,
    messages: Vec<Message>,
    tools: Vec<ToolDefinition>,
    client_deadline: Duration,
    resp: ChatResponse,
) -> Result<(StructuredReply, ChatResponse)> {
    if let Some(reply) = parse_structured(&resp.content) {
        return Ok((reply, resp));
    }

    let mut corrective = messages;
    corrective.push(Message::assistant(resp.content.clone()));
    corrective.push(Message::system(CORRECTIVE_NOTICE));

    let resp = invoke(provider, model, corrective, tools, client_deadline).await?;
    match parse_structured(&resp.content) {
        Some(reply) => Ok((reply, resp)),
        None => Err(Error::SchemaViolation(format!(
            "model reply did not match the structured schema after a corrective retry: {}",
            resp.content
        ))),
    }
}

fn parse_structured(content: &str) -> Option<StructuredReply> {
    serde_json::from_str(content.trim()).ok()
}

/// A network-layer failure is always worth retrying. A provider error is
/// only transient when it wraps a 429 or 5xx response; a 4xx means the
/// request itself is bad and retrying it would just fail the same way.
fn is_transient(err: &Error) -> bool {
    match err {
        Error::Http(_) | Error::Timeout(_) => true,
        Error::Provider { message, .. } => {
            message.contains("HTTP 429") || message.contains("HTTP 5")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_reply() {
        let reply = parse_structured(r#"{"agent_final_response":"hi","routine_number":2}"#).unwrap();
        assert_eq!(reply.agent_final_response, "hi");
        assert_eq!(reply.routine_number, Some(2));
    }

    #[test]
    fn parses_null_routine_number() {
        let reply = parse_structured(r#"{"agent_final_response":"hi","routine_number":null}"#).unwrap();
        assert_eq!(reply.routine_number, None);
    }

    #[test]
    fn rejects_malformed_reply() {
        assert!(parse_structured("not json").is_none());
        assert!(parse_structured(r#"{"agent_final_response":"hi"}"#).is_some());
        assert!(parse_structured(r#"{"routine_number":1}"#).is_none());
    }
}
