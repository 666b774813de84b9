//! Turn execution loop (C6) — the heart of the registration gateway.
//!
//! One call to [`run_turn`] does everything a single chat message needs:
//! classify or continue routing, render the current step's instructions,
//! call the model, dispatch at most one round of tool calls, advance the
//! step pointer, and fast-forward through any server-side routing steps.

use std::time::Duration;

use reg_domain::error::{Error, Result};
use reg_domain::tool::Message;
use reg_domain::trace::TraceEvent;
use reg_sessions::{AgentName, Session, SessionMetadata, Turn, TurnRole};

use crate::agents::AgentDefinition;
use crate::llm_invoker::{self, StructuredReply};
use crate::routing::{self, Classification};
use crate::state::AppState;
use crate::tools::{self, DispatchContext};

use super::steps::{StepDefinition, Transition};

/// Consecutive server-side routing hops allowed before the engine treats
/// the chain as a misconfigured loop rather than legitimate routing.
const MAX_SERVER_HOPS: u32 = 4;

pub struct TurnOutcome {
    pub reply: String,
    pub agent: AgentName,
    pub step: Option<u32>,
}

/// Process one inbound chat message for a session.
pub async fn run_turn(state: &AppState, session_id: &str, user_message: &str) -> Result<TurnOutcome> {
    let session = state
        .sessions
        .get(session_id)
        .unwrap_or_else(|| Session::new(session_id));

    if session.agent == AgentName::Orchestrator && session.step.is_none() {
        return run_orchestrator_or_route(state, session_id, user_message).await;
    }

    state.sessions.append(session_id, Turn::user(user_message));
    run_workflow_from(state, session_id, user_message).await
}

/// Outside any workflow: classify the message as a registration code or
/// hand it to the orchestrator agent for ordinary conversation.
async fn run_orchestrator_or_route(state: &AppState, session_id: &str, user_message: &str) -> Result<TurnOutcome> {
    match routing::classify(user_message, &state.config.registration, &state.adapters.database).await {
        Ok(Classification::Orchestrator) => {
            state.sessions.append(session_id, Turn::user(user_message));
            run_plain_agent_turn(state, session_id, AgentName::Orchestrator, user_message).await
        }
        Ok(Classification::Registration { route, metadata }) => {
            TraceEvent::RouteClassified {
                session_id: session_id.to_string(),
                track: format!("{:?}", route),
                matched_code: true,
            }
            .emit();
            state.sessions.inject_metadata(session_id, metadata);
            state.sessions.set_agent(session_id, route.agent());
            state.sessions.set_step(session_id, Some(route.entry_step()));
            state.sessions.append(session_id, Turn::user(user_message));
            run_workflow_from(state, session_id, "").await
        }
        Err(e) => {
            TraceEvent::RouteClassified {
                session_id: session_id.to_string(),
                track: "rejected".to_string(),
                matched_code: true,
            }
            .emit();
            let reply = e.to_string();
            state.sessions.append(session_id, Turn::user(user_message));
            state
                .sessions
                .append(session_id, Turn::assistant(reply.clone(), AgentName::Orchestrator));
            Ok(TurnOutcome { reply, agent: AgentName::Orchestrator, step: None })
        }
    }
}

/// A turn outside the step workflow (the orchestrator chatting freely).
async fn run_plain_agent_turn(
    state: &AppState,
    session_id: &str,
    agent_name: AgentName,
    user_message: &str,
) -> Result<TurnOutcome> {
    let agent = state.agents.get(agent_name);
    let history = state
        .sessions
        .get(session_id)
        .map(|s| turns_to_messages(&s.turns))
        .unwrap_or_default();

    let mut messages = vec![Message::system(agent.base_instructions)];
    messages.extend(history);
    if !user_message.is_empty() {
        messages.push(Message::user(user_message));
    }

    let (reply, _) = call_agent(state, agent, agent.tools.to_vec(), session_id, messages).await?;
    state
        .sessions
        .append(session_id, Turn::assistant(reply.agent_final_response.clone(), agent_name));
    Ok(TurnOutcome { reply: reply.agent_final_response, agent: agent_name, step: None })
}

/// Drive the step workflow forward, starting from whatever step the
/// session currently points at, fast-forwarding through server-side
/// routing steps until a user-facing reply is produced or the engine
/// hits its safety limit.
async fn run_workflow_from(state: &AppState, session_id: &str, user_message: &str) -> Result<TurnOutcome> {
    let mut current_message = user_message.to_string();
    let mut hops = 0u32;

    loop {
        let session = state
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::Other(format!("session {session_id} vanished mid-turn")))?;

        let step_number = session
            .step
            .ok_or_else(|| Error::Other("workflow turn requested with no active step".into()))?;

        if super::steps::StepTable::is_reserved(step_number) {
            return Err(Error::UnknownStep(step_number));
        }
        let step_def = state
            .steps
            .get(step_number)
            .ok_or(Error::UnreachableStep(step_number))?
            .clone();

        let agent = state.agents.get(session.agent);
        let messages = build_step_messages(agent, &step_def, &session, &current_message);
        let step_tools = scoped_tools(agent.tools, step_def.allowed_tools);

        let (reply, _resp) = call_agent(state, agent, step_tools, session_id, messages).await?;

        if step_number == 201 {
            check_security_attempt(state, session_id, &session, step_number, &reply)?;
        }

        state
            .sessions
            .append(session_id, Turn::assistant(reply.agent_final_response.clone(), session.agent));

        let next_step = reply.routine_number;
        apply_transition(state, session_id, step_number, next_step, step_def.transition);

        if step_number == 29 {
            dispatch_confirmation_sms(state, session_id).await;
        }

        if !step_def.server_side {
            return Ok(TurnOutcome {
                reply: reply.agent_final_response,
                agent: session.agent,
                step: next_step,
            });
        }

        hops += 1;
        if hops > MAX_SERVER_HOPS {
            return Err(Error::Other(format!(
                "server-side routing did not settle after {MAX_SERVER_HOPS} hops starting at step {step_number}"
            )));
        }
        if next_step.is_none() {
            return Ok(TurnOutcome { reply: reply.agent_final_response, agent: session.agent, step: None });
        }
        current_message = String::new();
    }
}

fn apply_transition(
    state: &AppState,
    session_id: &str,
    from_step: u32,
    next_step: Option<u32>,
    transition: Transition,
) {
    match (transition, next_step) {
        (Transition::Fixed(expected), Some(next)) if next != expected => {
            tracing::warn!(
                session_id, from_step, expected, actual = next,
                "model's routine_number did not match the step's declared fixed transition"
            );
        }
        (Transition::Terminal, Some(next)) => {
            tracing::warn!(
                session_id, from_step, actual = next,
                "model returned a routine_number from a step declared terminal"
            );
        }
        _ => {}
    }

    match next_step {
        Some(next) => state.sessions.set_step(session_id, Some(next)),
        None => {
            tracing::warn!(session_id, from_step, "workflow step returned no routine_number");
        }
    }
}

/// Restrict an agent's full tool list to the ones a step actually permits.
/// `step_tools` is empty for steps that ask a plain question; an empty
/// allow-list means the LLM sees no tool schemas for that call.
fn scoped_tools(agent_tools: &'static [&'static str], step_tools: &'static [&'static str]) -> Vec<&'static str> {
    agent_tools.iter().copied().filter(|name| step_tools.contains(name)).collect()
}

/// Step 201 is the re-registration security check (DOB + postcode). Count a
/// failed attempt whenever the model re-asks the same step rather than
/// advancing, and fail the turn once the configured bound is exceeded —
/// spec.md §9's resolution of the lockout open question.
fn check_security_attempt(
    state: &AppState,
    session_id: &str,
    session: &Session,
    step_number: u32,
    reply: &StructuredReply,
) -> Result<()> {
    if reply.routine_number == Some(step_number) {
        let attempts = state.sessions.record_security_attempt(session_id);
        if attempts >= state.config.sessions.max_security_attempts {
            return Err(Error::Auth(format!(
                "too many failed identity checks for session {session_id}; \
                 the parent should be directed to email support"
            )));
        }
    } else if session.security_attempts > 0 {
        state.sessions.reset_security_attempts(session_id);
    }
    Ok(())
}

/// Send the registration-confirmation SMS as a side effect of a
/// successful step-29 tool dispatch. No agent's tool list exposes SMS
/// sending to the model; the engine triggers it directly.
async fn dispatch_confirmation_sms(state: &AppState, session_id: &str) {
    let Some(session) = state.sessions.get(session_id) else { return };
    let mobile = session
        .turns
        .iter()
        .rev()
        .filter(|t| t.tool_name.as_deref() == Some("write-registration"))
        .find_map(|t| {
            t.tool_arguments
                .as_ref()
                .and_then(|args| args.get("fields"))
                .and_then(|fields| fields.get("parent_mobile"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        });
    let Some(mobile) = mobile else {
        tracing::warn!(session_id, "no parent mobile on file, skipping confirmation SMS");
        return;
    };
    let body = format!(
        "Thanks for registering with {}! We'll be in touch with next steps.",
        session.metadata.team.as_deref().unwrap_or("the club")
    );
    match state.adapters.sms.send(&mobile, &body).await {
        Ok(_) => tracing::info!(session_id, "confirmation SMS dispatched"),
        Err(e) => tracing::warn!(session_id, error = %e, "failed to dispatch confirmation SMS"),
    }
}

/// Run one model round for a workflow step: an initial call, at most one
/// round of tool dispatch, and a final structured reply.
async fn call_agent(
    state: &AppState,
    agent: &AgentDefinition,
    allowed_tools: Vec<&str>,
    session_id: &str,
    mut messages: Vec<Message>,
) -> Result<(StructuredReply, reg_providers::ChatResponse)> {
    let provider = state
        .llm
        .for_role(agent.role)
        .ok_or_else(|| Error::Config(format!("no LLM provider configured for role \"{}\"", agent.role)))?;
    let model = state.llm.model_for_role(agent.role).map(str::to_string);
    let deadline = Duration::from_millis(state.config.llm.default_timeout_ms);
    let tool_defs = tools::build_tool_definitions(&allowed_tools);

    let first = llm_invoker::invoke(provider.as_ref(), model.clone(), messages.clone(), tool_defs.clone(), deadline).await?;

    if first.tool_calls.is_empty() {
        return llm_invoker::finalize_structured(provider.as_ref(), model, messages, tool_defs, deadline, first).await;
    }

    messages.push(Message::assistant(first.content.clone()));
    let ctx = DispatchContext { session_id, agent: agent.name };
    for call in &first.tool_calls {
        let outcome = tools::dispatch(state, agent.execution_mode, &call.tool_name, &call.arguments, &ctx).await;
        state.sessions.append(
            session_id,
            Turn::tool(
                call.tool_name.clone(),
                call.arguments.clone(),
                serde_json::json!({ "content": outcome.content.clone(), "is_error": outcome.is_error }),
            ),
        );
        TraceEvent::ToolDispatched {
            session_id: session_id.to_string(),
            tool_name: call.tool_name.clone(),
            duration_ms: 0,
            is_error: outcome.is_error,
        }
        .emit();
        messages.push(Message::tool_result(call.call_id.clone(), outcome.content));
    }

    let second = llm_invoker::invoke(provider.as_ref(), model.clone(), messages.clone(), Vec::new(), deadline).await?;
    if !second.tool_calls.is_empty() {
        return Err(Error::ToolLoop { rounds: 3 });
    }
    llm_invoker::finalize_structured(provider.as_ref(), model, messages, Vec::new(), deadline, second).await
}

fn build_step_messages(
    agent: &AgentDefinition,
    step: &StepDefinition,
    session: &Session,
    user_message: &str,
) -> Vec<Message> {
    let task = render_template(step.task_template, &session.metadata);
    let mut messages = vec![Message::system(format!("{}\n\n{}", agent.base_instructions, task))];
    messages.extend(turns_to_messages(&session.turns));
    if !user_message.is_empty() {
        messages.push(Message::user(user_message));
    }
    messages
}

/// Substitute the placeholders we can fill in deterministically from
/// session metadata. Anything else is left literal; the model still has
/// the full conversation transcript to draw on.
fn render_template(template: &str, metadata: &SessionMetadata) -> String {
    let mut out = template.to_string();
    if let Some(team) = &metadata.team {
        out = out.replace("{team}", team);
    }
    if let Some(age_group) = &metadata.age_group {
        out = out.replace("{age_group}", age_group);
    }
    if let Some(season) = &metadata.season {
        out = out.replace("{season}", season);
    }
    if let Some(first_name) = &metadata.first_name {
        out = out.replace("{child_first_name}", first_name);
    }
    if let Some(parent_first_name) = metadata.extra.get("parent_first_name") {
        out = out.replace("{parent_first_name}", parent_first_name);
    }
    out
}

fn turns_to_messages(turns: &[Turn]) -> Vec<Message> {
    turns
        .iter()
        .filter_map(|turn| match turn.role {
            TurnRole::User => Some(Message::user(turn.content.clone())),
            TurnRole::Assistant => Some(Message::assistant(turn.content.clone())),
            TurnRole::System | TurnRole::Tool => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_template_substitutes_known_placeholders() {
        let metadata = SessionMetadata {
            team: Some("tigers".into()),
            age_group: Some("U10".into()),
            season: Some("2026-27".into()),
            ..Default::default()
        };
        let out = render_template("Welcome to {team} {age_group} for {season}.", &metadata);
        assert_eq!(out, "Welcome to tigers U10 for 2026-27.");
    }

    #[test]
    fn render_template_leaves_unknown_placeholders_literal() {
        let metadata = SessionMetadata::default();
        let out = render_template("Ask {child_first_name} a question.", &metadata);
        assert_eq!(out, "Ask {child_first_name} a question.");
    }

    #[test]
    fn turns_to_messages_skips_tool_and_system_turns() {
        let turns = vec![
            Turn::user("hi"),
            Turn::tool("db_query", serde_json::json!({}), serde_json::json!({})),
            Turn::assistant("hello", AgentName::Orchestrator),
        ];
        let messages = turns_to_messages(&turns);
        assert_eq!(messages.len(), 2);
    }
}
