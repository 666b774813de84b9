//! Tool registry & dispatcher (C1).
//!
//! Declares the JSON schema the LLM sees for every tool and routes tool
//! calls to their handlers — either in-process or, for agents whose
//! `execution_mode` is `Remote`, across the remote tool protocol.

use serde_json::{json, Value};

use reg_adapters::database::RegistrationFields;
use reg_domain::tool::ToolDefinition;
use reg_protocol::{RemoteToolRequest, RemoteToolResponse};
use reg_sessions::AgentName;

use crate::agents::ExecutionMode;
use crate::state::AppState;

/// Result of dispatching one tool call: the text handed back to the model
/// as the tool result, and whether it represents a failure.
pub struct ToolOutcome {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutcome {
    fn ok(value: Value) -> Self {
        Self { content: value.to_string(), is_error: false }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            content: json!({ "error": message.into() }).to_string(),
            is_error: true,
        }
    }
}

pub struct DispatchContext<'a> {
    pub session_id: &'a str,
    pub agent: AgentName,
}

/// Build the tool definitions for a named allow-list, e.g. an agent's
/// `tools` field. Unknown names are skipped rather than panicking, since
/// the allow-list and the schema table are maintained independently.
pub fn build_tool_definitions(names: &[&str]) -> Vec<ToolDefinition> {
    names.iter().filter_map(|&name| schema_for(name)).collect()
}

fn schema_for(name: &str) -> Option<ToolDefinition> {
    let (description, parameters) = match name {
        "address-lookup" => (
            "Resolve a UK address from a postcode and house number or name.",
            json!({
                "type": "object",
                "properties": {
                    "postcode": {"type": "string"},
                    "house_identifier": {"type": "string"}
                },
                "required": ["postcode", "house_identifier"]
            }),
        ),
        "address-validate" => (
            "Validate and normalise a manually typed address.",
            json!({
                "type": "object",
                "properties": {
                    "line1": {"type": "string"},
                    "town": {"type": "string"},
                    "postcode": {"type": "string"}
                },
                "required": ["line1", "town", "postcode"]
            }),
        ),
        "DOB-validate" => (
            "Validate a date of birth and check it is plausible for the given age group.",
            json!({
                "type": "object",
                "properties": {
                    "date_of_birth": {"type": "string", "description": "any common date format"},
                    "age_group": {"type": "string"}
                },
                "required": ["date_of_birth", "age_group"]
            }),
        ),
        "payment-token-create" => (
            "Create a Direct Debit billing request and activate the subscription.",
            json!({
                "type": "object",
                "properties": {
                    "registration_snapshot": {"type": "object"},
                    "day_of_month": {"type": "integer"}
                },
                "required": ["registration_snapshot", "day_of_month"]
            }),
        ),
        "write-registration" => (
            "Persist the completed registration record.",
            json!({
                "type": "object",
                "properties": { "fields": { "type": "object" } },
                "required": ["fields"]
            }),
        ),
        "shirt-number-check" => (
            "Check whether a shirt number is already taken for a team and age group.",
            json!({
                "type": "object",
                "properties": {
                    "team": {"type": "string"},
                    "age_group": {"type": "string"},
                    "number": {"type": "integer", "minimum": 1, "maximum": 25}
                },
                "required": ["team", "age_group", "number"]
            }),
        ),
        "write-kit" => (
            "Record the kit size, shirt number, and kit type for a registration.",
            json!({
                "type": "object",
                "properties": {
                    "record_id": {"type": "string"},
                    "size": {"type": "string"},
                    "number": {"type": "integer"},
                    "kit_type": {"type": "string"}
                },
                "required": ["record_id", "size", "number", "kit_type"]
            }),
        ),
        "put-image" => (
            "Store an already-processed image and return its URL.",
            json!({
                "type": "object",
                "properties": {
                    "image_base64": {"type": "string"},
                    "key": {"type": "string"},
                    "content_type": {"type": "string"}
                },
                "required": ["image_base64", "key", "content_type"]
            }),
        ),
        "write-photo-url" => (
            "Attach a stored photo's URL to a registration record.",
            json!({
                "type": "object",
                "properties": {
                    "record_id": {"type": "string"},
                    "url": {"type": "string"}
                },
                "required": ["record_id", "url"]
            }),
        ),
        "check-kit-needed" => (
            "Check whether a player still needs kit issued this season.",
            json!({
                "type": "object",
                "properties": {
                    "first": {"type": "string"},
                    "last": {"type": "string"},
                    "team": {"type": "string"},
                    "age_group": {"type": "string"}
                },
                "required": ["first", "last", "team", "age_group"]
            }),
        ),
        "player-lookup" => (
            "Look up a player's prior-season registration record.",
            json!({
                "type": "object",
                "properties": {
                    "team": {"type": "string"},
                    "age_group": {"type": "string"},
                    "season": {"type": "string"},
                    "first": {"type": "string"},
                    "last": {"type": "string"}
                },
                "required": ["team", "age_group", "season", "first", "last"]
            }),
        ),
        "copy-record-to-current-season" => (
            "Carry a player's registration forward into the current season.",
            json!({
                "type": "object",
                "properties": { "fields": { "type": "object" } },
                "required": ["fields"]
            }),
        ),
        "db_query" => (
            "Read-only lookup against the registration database.",
            json!({
                "type": "object",
                "properties": {
                    "kind": {"type": "string", "enum": ["team_info", "player_status"]},
                    "team": {"type": "string"},
                    "age_group": {"type": "string"},
                    "season": {"type": "string"},
                    "first": {"type": "string"},
                    "last": {"type": "string"}
                },
                "required": ["kind"]
            }),
        ),
        _ => return None,
    };
    Some(ToolDefinition { name: name.to_string(), description: description.to_string(), parameters })
}

/// Dispatch one tool call, honouring the agent's execution mode.
pub async fn dispatch(
    state: &AppState,
    mode: ExecutionMode,
    name: &str,
    arguments: &Value,
    ctx: &DispatchContext<'_>,
) -> ToolOutcome {
    match mode {
        ExecutionMode::Remote => dispatch_remote(state, name, arguments, ctx).await,
        ExecutionMode::Local => dispatch_local(state, name, arguments, ctx).await,
    }
}

async fn dispatch_remote(state: &AppState, name: &str, arguments: &Value, ctx: &DispatchContext<'_>) -> ToolOutcome {
    let Some(url) = &state.config.tools.remote_tool_url else {
        return ToolOutcome::error("remote tool execution is enabled but no remote_tool_url is configured");
    };
    let client = reqwest::Client::new();
    let req = RemoteToolRequest {
        request_id: uuid::Uuid::new_v4().to_string(),
        session_id: ctx.session_id.to_string(),
        tool_name: name.to_string(),
        arguments: arguments.clone(),
    };
    let resp = match client.post(url).json(&req).send().await {
        Ok(r) => r,
        Err(e) => return ToolOutcome::error(format!("remote tool server unreachable: {e}")),
    };
    let body: RemoteToolResponse = match resp.json().await {
        Ok(b) => b,
        Err(e) => return ToolOutcome::error(format!("remote tool server returned a malformed response: {e}")),
    };
    if body.success {
        ToolOutcome { content: body.result.to_string(), is_error: false }
    } else {
        ToolOutcome::error(body.error.unwrap_or_else(|| "remote tool call failed".into()))
    }
}

async fn dispatch_local(state: &AppState, name: &str, arguments: &Value, ctx: &DispatchContext<'_>) -> ToolOutcome {
    let adapters = &state.adapters;
    let result: Result<Value, String> = match name {
        "address-lookup" => {
            let postcode = arg_str(arguments, "postcode");
            let house = arg_str(arguments, "house_identifier");
            match (postcode, house) {
                (Some(p), Some(h)) => adapters
                    .address
                    .lookup(&p, &h)
                    .await
                    .map(|addr| match addr {
                        Some(a) => json!({"found": true, "address": a}),
                        None => json!({"found": false}),
                    })
                    .map_err(|e| e.to_string()),
                _ => Err("postcode and house_identifier are required".into()),
            }
        }
        "address-validate" => address_validate(arguments),
        "DOB-validate" => dob_validate(arguments, &state.config.registration.age_cutoff_month_day),
        "payment-token-create" => {
            let snapshot = arguments.get("registration_snapshot").cloned().unwrap_or(Value::Null);
            let day = arguments.get("day_of_month").and_then(|v| v.as_i64()).unwrap_or(-1) as i32;
            match adapters.payment.create_billing_request(&snapshot).await {
                Ok(billing_request_id) => adapters
                    .payment
                    .activate_subscription(&billing_request_id, day)
                    .await
                    .map(|_| json!({"billing_request_id": billing_request_id}))
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            }
        }
        "write-registration" | "copy-record-to-current-season" => {
            match arguments.get("fields").cloned().map(serde_json::from_value::<RegistrationFields>) {
                Some(Ok(fields)) => adapters
                    .database
                    .upsert_registration(&fields)
                    .await
                    .map(|record_id| json!({"record_id": record_id}))
                    .map_err(|e| e.to_string()),
                Some(Err(e)) => Err(format!("fields did not match the registration schema: {e}")),
                None => Err("fields is required".into()),
            }
        }
        "shirt-number-check" => {
            let team = arg_str(arguments, "team");
            let age_group = arg_str(arguments, "age_group");
            let number = arguments.get("number").and_then(|v| v.as_u64());
            match (team, age_group, number) {
                (Some(t), Some(a), Some(n)) => adapters
                    .database
                    .shirt_number_taken(&t, &a, n as u8)
                    .await
                    .map(|taken| json!({"taken": taken}))
                    .map_err(|e| e.to_string()),
                _ => Err("team, age_group, and number are required".into()),
            }
        }
        "write-kit" => {
            let record_id = arg_str(arguments, "record_id");
            let size = arg_str(arguments, "size");
            let number = arguments.get("number").and_then(|v| v.as_u64());
            let kit_type = arg_str(arguments, "kit_type");
            match (record_id, size, number, kit_type) {
                (Some(r), Some(s), Some(n), Some(t)) => adapters
                    .database
                    .write_kit(&r, &s, n as u8, &t)
                    .await
                    .map(|_| json!({"ok": true}))
                    .map_err(|e| e.to_string()),
                _ => Err("record_id, size, number, and kit_type are required".into()),
            }
        }
        "put-image" => {
            let bytes = arguments
                .get("image_base64")
                .and_then(|v| v.as_str())
                .and_then(|s| base64_decode(s).ok());
            let key = arg_str(arguments, "key");
            let content_type = arg_str(arguments, "content_type");
            match (bytes, key, content_type) {
                (Some(b), Some(k), Some(ct)) => adapters
                    .storage
                    .put_image(b, &k, &ct)
                    .await
                    .map(|url| json!({"url": url}))
                    .map_err(|e| e.to_string()),
                _ => Err("image_base64, key, and content_type are required".into()),
            }
        }
        "write-photo-url" => {
            let record_id = arg_str(arguments, "record_id");
            let url = arg_str(arguments, "url");
            match (record_id, url) {
                (Some(r), Some(u)) => adapters
                    .database
                    .write_photo_url(&r, &u)
                    .await
                    .map(|_| json!({"ok": true}))
                    .map_err(|e| e.to_string()),
                _ => Err("record_id and url are required".into()),
            }
        }
        "check-kit-needed" => {
            let first = arg_str(arguments, "first");
            let last = arg_str(arguments, "last");
            let team = arg_str(arguments, "team");
            let age_group = arg_str(arguments, "age_group");
            match (first, last, team, age_group) {
                (Some(f), Some(l), Some(t), Some(a)) => adapters
                    .database
                    .check_kit_needed(&f, &l, &t, &a)
                    .await
                    .map(|needed| json!({"needed": needed}))
                    .map_err(|e| e.to_string()),
                _ => Err("first, last, team, and age_group are required".into()),
            }
        }
        "player-lookup" => {
            let team = arg_str(arguments, "team");
            let age_group = arg_str(arguments, "age_group");
            let season = arg_str(arguments, "season");
            let first = arg_str(arguments, "first");
            let last = arg_str(arguments, "last");
            match (team, age_group, season, first, last) {
                (Some(t), Some(a), Some(s), Some(f), Some(l)) => adapters
                    .database
                    .lookup_player(&t, &a, &s, &f, &l)
                    .await
                    .map(|record| match record {
                        Some(r) => json!({"found": true, "record": r}),
                        None => json!({"found": false}),
                    })
                    .map_err(|e| e.to_string()),
                _ => Err("team, age_group, season, first, and last are required".into()),
            }
        }
        "db_query" => db_query(adapters, arguments).await,
        _ => return ToolOutcome::error(format!("tool not found: {name}")),
    };

    let _ = ctx;
    match result {
        Ok(value) => ToolOutcome::ok(value),
        Err(message) => ToolOutcome::error(message),
    }
}

async fn db_query(adapters: &crate::state::Adapters, arguments: &Value) -> Result<Value, String> {
    match arg_str(arguments, "kind").as_deref() {
        Some("team_info") => {
            let team = arg_str(arguments, "team").ok_or("team is required")?;
            let age_group = arg_str(arguments, "age_group").ok_or("age_group is required")?;
            adapters
                .database
                .lookup_team(&team, &age_group)
                .await
                .map(|t| match t {
                    Some(t) => json!({"found": true, "team": t}),
                    None => json!({"found": false}),
                })
                .map_err(|e| e.to_string())
        }
        Some("player_status") => {
            let team = arg_str(arguments, "team").ok_or("team is required")?;
            let age_group = arg_str(arguments, "age_group").ok_or("age_group is required")?;
            let season = arg_str(arguments, "season").ok_or("season is required")?;
            let first = arg_str(arguments, "first").ok_or("first is required")?;
            let last = arg_str(arguments, "last").ok_or("last is required")?;
            adapters
                .database
                .lookup_player(&team, &age_group, &season, &first, &last)
                .await
                .map(|r| match r {
                    Some(r) => json!({"found": true, "record": r}),
                    None => json!({"found": false}),
                })
                .map_err(|e| e.to_string())
        }
        _ => Err("kind must be team_info or player_status".into()),
    }
}

fn address_validate(arguments: &Value) -> Result<Value, String> {
    let line1 = arg_str(arguments, "line1").ok_or("line1 is required")?;
    let town = arg_str(arguments, "town").ok_or("town is required")?;
    let postcode = arg_str(arguments, "postcode").ok_or("postcode is required")?;
    let normalised_postcode: String = postcode.to_uppercase().split_whitespace().collect();
    Ok(json!({
        "line1": title_case(&line1),
        "town": title_case(&town),
        "postcode": normalised_postcode,
    }))
}

fn dob_validate(arguments: &Value, _age_cutoff_month_day: &str) -> Result<Value, String> {
    let raw = arg_str(arguments, "date_of_birth").ok_or("date_of_birth is required")?;
    let parsed = ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| chrono::NaiveDate::parse_from_str(&raw, fmt).ok())
        .ok_or_else(|| format!("could not parse date of birth \"{raw}\""))?;
    let today = chrono::Utc::now().date_naive();
    let years = today.years_since(parsed).unwrap_or(0);
    Ok(json!({
        "normalised": parsed.format("%d-%m-%Y").to_string(),
        "age_years": years,
    }))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn arg_str(arguments: &Value, key: &str) -> Option<String> {
    arguments.get(key).and_then(|v| v.as_str()).map(String::from)
}

fn base64_decode(s: &str) -> Result<Vec<u8>, String> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_validate_uppercases_and_strips_postcode_spaces() {
        let args = json!({"line1": "1 example street", "town": "manchester", "postcode": "m32 8jl"});
        let result = address_validate(&args).unwrap();
        assert_eq!(result["postcode"], "M328JL");
        assert_eq!(result["town"], "Manchester");
    }

    #[test]
    fn dob_validate_accepts_multiple_formats() {
        let args = json!({"date_of_birth": "01/02/2015", "age_group": "U10"});
        let result = dob_validate(&args, "08-31").unwrap();
        assert_eq!(result["normalised"], "01-02-2015");
    }

    #[test]
    fn dob_validate_rejects_garbage() {
        let args = json!({"date_of_birth": "not a date", "age_group": "U10"});
        assert!(dob_validate(&args, "08-31").is_err());
    }

    #[test]
    fn unknown_tool_name_yields_no_schema() {
        assert!(schema_for("does-not-exist").is_none());
    }

    #[test]
    fn build_tool_definitions_skips_unknown_names() {
        let defs = build_tool_definitions(&["db_query", "not-a-tool"]);
        assert_eq!(defs.len(), 1);
    }
}
