//! Direct Debit payment adapter.

use crate::error::{AdapterError, Result};
use reg_domain::config::EndpointConfig;
use serde_json::Value;

pub struct PaymentAdapter {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
}

impl PaymentAdapter {
    pub fn from_config(cfg: &EndpointConfig) -> reg_domain::Result<Self> {
        let credential = super::resolve_credential("payment", cfg)?;
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

    pub async fn create_billing_request(&self, registration_snapshot: &Value) -> Result<String> {
        let resp = self
            .request(reqwest::Method::POST, "/billing-requests")
            .json(registration_snapshot)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AdapterError::from_status(status, &text));
        }
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| AdapterError::Permanent(format!("malformed response: {e}")))?;
        body.get("billing_request_id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| AdapterError::Permanent("response missing billing_request_id".into()))
    }

    /// Activate the recurring subscription. `day_of_month` must be in
    /// `{1..28, -1}`; the last-day-of-month sentinel `-1` is substituted for
    /// 29, 30 or 31 here so callers never need to special-case month length.
    pub async fn activate_subscription(&self, billing_request_id: &str, day_of_month: i32) -> Result<()> {
        let day = normalise_payment_day(day_of_month);
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/billing-requests/{billing_request_id}/activate"),
            )
            .json(&serde_json::json!({"day_of_month": day}))
            .send()
            .await?;
        super::empty_or_error(resp).await
    }
}

fn normalise_payment_day(day: i32) -> i32 {
    if day >= 29 || day <= 0 {
        -1
    } else {
        day
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_29_30_31_become_last_day_sentinel() {
        assert_eq!(normalise_payment_day(29), -1);
        assert_eq!(normalise_payment_day(30), -1);
        assert_eq!(normalise_payment_day(31), -1);
    }

    #[test]
    fn ordinary_days_pass_through() {
        assert_eq!(normalise_payment_day(1), 1);
        assert_eq!(normalise_payment_day(28), 28);
    }

    #[test]
    fn sentinel_already_negative_one_is_preserved() {
        assert_eq!(normalise_payment_day(-1), -1);
    }
}
