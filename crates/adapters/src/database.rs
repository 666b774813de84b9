//! Tabular registration database adapter.
//!
//! The database itself is an external system (schema owned by that system);
//! this adapter only knows the narrow set of operations the workflow engine
//! needs and wraps its responses into the shared error taxonomy.

use crate::error::{retry_fixed, AdapterError, Result};
use reg_domain::config::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub age_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub record_id: String,
    pub first_name: String,
    pub last_name: String,
    pub team: String,
    pub age_group: String,
    pub season: String,
}

/// The fields the engine writes when creating or updating a registration.
/// Normalisation (title case, DD-MM-YYYY, uppercased postcode, etc.) is the
/// workflow engine's responsibility; this adapter persists what it is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationFields {
    pub parent_first_name: String,
    pub parent_last_name: String,
    pub parent_mobile: String,
    pub parent_email: String,
    pub child_first_name: String,
    pub child_last_name: String,
    pub date_of_birth: String,
    pub postcode: String,
    pub address_line1: String,
    pub team: String,
    pub age_group: String,
    pub season: String,
    pub preferred_payment_day: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shirt_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kit_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_request_id: Option<String>,
}

pub struct DatabaseAdapter {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
}

impl DatabaseAdapter {
    pub fn from_config(cfg: &EndpointConfig) -> reg_domain::Result<Self> {
        let credential = super::resolve_credential("database", cfg)?;
        Ok(Self {
            client: super::default_client()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, format!("{}{path}", self.base_url));
        super::with_auth(req, &self.credential)
    }

    pub async fn lookup_team(&self, name: &str, age_group: &str) -> Result<Option<Team>> {
        let resp = self
            .request(reqwest::Method::GET, "/teams/lookup")
            .query(&[("name", name), ("age_group", age_group)])
            .send()
            .await?;
        super::optional_json(resp).await
    }

    pub async fn lookup_player(
        &self,
        team: &str,
        age_group: &str,
        season: &str,
        first: &str,
        last: &str,
    ) -> Result<Option<PlayerRecord>> {
        let resp = self
            .request(reqwest::Method::GET, "/players/lookup")
            .query(&[
                ("team", team),
                ("age_group", age_group),
                ("season", season),
                ("first", first),
                ("last", last),
            ])
            .send()
            .await?;
        super::optional_json(resp).await
    }

    /// Idempotent write: retried twice at 0.5s/1s per the canonical retry table.
    pub async fn upsert_registration(&self, fields: &RegistrationFields) -> Result<String> {
        retry_fixed(&[Duration::from_millis(500), Duration::from_secs(1)], || async {
            let resp = self
                .request(reqwest::Method::POST, "/registrations")
                .json(fields)
                .send()
                .await?;
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(AdapterError::from_status(status, &text));
            }
            let body: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| AdapterError::Permanent(format!("malformed response: {e}")))?;
            body.get("record_id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or_else(|| AdapterError::Permanent("response missing record_id".into()))
        })
        .await
    }

    pub async fn shirt_number_taken(&self, team: &str, age_group: &str, n: u8) -> Result<bool> {
        let resp = self
            .request(reqwest::Method::GET, "/registrations/shirt-number-taken")
            .query(&[("team", team), ("age_group", age_group), ("number", &n.to_string())])
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AdapterError::from_status(status, &text));
        }
        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AdapterError::Permanent(format!("malformed response: {e}")))?;
        Ok(body.get("taken").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    pub async fn write_kit(&self, record_id: &str, size: &str, number: u8, kit_type: &str) -> Result<()> {
        retry_fixed(&[Duration::from_millis(500), Duration::from_secs(1)], || async {
            let resp = self
                .request(reqwest::Method::PATCH, &format!("/registrations/{record_id}/kit"))
                .json(&serde_json::json!({"size": size, "number": number, "type": kit_type}))
                .send()
                .await?;
            super::empty_or_error(resp).await
        })
        .await
    }

    pub async fn write_photo_url(&self, record_id: &str, url: &str) -> Result<()> {
        retry_fixed(&[Duration::from_millis(500), Duration::from_secs(1)], || async {
            let resp = self
                .request(reqwest::Method::PATCH, &format!("/registrations/{record_id}/photo"))
                .json(&serde_json::json!({"url": url}))
                .send()
                .await?;
            super::empty_or_error(resp).await
        })
        .await
    }

    pub async fn check_kit_needed(&self, first: &str, last: &str, team: &str, age_group: &str) -> Result<bool> {
        let resp = self
            .request(reqwest::Method::GET, "/registrations/kit-needed")
            .query(&[("first", first), ("last", last), ("team", team), ("age_group", age_group)])
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AdapterError::from_status(status, &text));
        }
        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AdapterError::Permanent(format!("malformed response: {e}")))?;
        Ok(body.get("needed").and_then(|v| v.as_bool()).unwrap_or(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_fields_omit_unset_optionals_when_serialized() {
        let fields = RegistrationFields {
            parent_first_name: "Jo".into(),
            parent_last_name: "Bloggs".into(),
            parent_mobile: "07123456789".into(),
            parent_email: "jo@example.com".into(),
            child_first_name: "Sam".into(),
            child_last_name: "Bloggs".into(),
            date_of_birth: "01-02-2015".into(),
            postcode: "M32 8JL".into(),
            address_line1: "1 Example Street".into(),
            team: "tigers".into(),
            age_group: "U10".into(),
            season: "2526".into(),
            preferred_payment_day: -1,
            shirt_number: None,
            kit_size: None,
            photo_url: None,
            billing_request_id: None,
        };
        let json = serde_json::to_value(&fields).unwrap();
        assert!(json.get("shirt_number").is_none());
        assert!(json.get("photo_url").is_none());
    }
}
