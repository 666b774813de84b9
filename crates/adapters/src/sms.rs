//! SMS adapter.

use crate::error::{retry_fixed, AdapterError, Result};
use reg_domain::config::EndpointConfig;
use serde_json::Value;
use std::time::Duration;

pub struct SmsAdapter {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
}

impl SmsAdapter {
    pub fn from_config(cfg: &EndpointConfig) -> reg_domain::Result<Self> {
        let credential = super::resolve_credential("sms", cfg)?;
        Ok(Self {
            client: super::default_client()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    /// Send an SMS, retrying transient failures 3 times with backoff
    /// starting at 1s (1s, 2s, 4s) per the canonical retry table.
    pub async fn send(&self, to: &str, body: &str) -> Result<String> {
        retry_fixed(
            &[Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)],
            || async {
                let req = self
                    .client
                    .post(format!("{}/messages", self.base_url))
                    .json(&serde_json::json!({"to": to, "body": body}));
                let resp = super::with_auth(req, &self.credential).send().await?;
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                if !status.is_success() {
                    return Err(AdapterError::from_status(status, &text));
                }
                let parsed: Value = serde_json::from_str(&text)
                    .map_err(|e| AdapterError::Permanent(format!("malformed response: {e}")))?;
                parsed
                    .get("message_sid")
                    .and_then(|v| v.as_str())
                    .map(String::from)
                    .ok_or_else(|| AdapterError::Permanent("response missing message_sid".into()))
            },
        )
        .await
    }
}
