//! Address-lookup adapter.

use crate::error::{AdapterError, Result};
use reg_domain::config::EndpointConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub town: String,
    pub postcode: String,
}

pub struct AddressAdapter {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
}

impl AddressAdapter {
    pub fn from_config(cfg: &EndpointConfig) -> reg_domain::Result<Self> {
        let credential = super::resolve_credential("address", cfg)?;
        Ok(Self {
            client: super::default_client()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    pub async fn lookup(&self, postcode: &str, house_identifier: &str) -> Result<Option<Address>> {
        let req = self
            .client
            .get(format!("{}/addresses/lookup", self.base_url))
            .query(&[("postcode", postcode), ("house_identifier", house_identifier)]);
        let resp = super::with_auth(req, &self.credential).send().await?;
        super::optional_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_line2_defaults_to_none_when_absent() {
        let json = serde_json::json!({"line1": "1 Example St", "town": "Manchester", "postcode": "M32 8JL"});
        let address: Address = serde_json::from_value(json).unwrap();
        assert!(address.line2.is_none());
    }

    #[test]
    fn from_status_not_found_maps_to_not_found_variant() {
        assert!(matches!(
            AdapterError::from_status(reqwest::StatusCode::NOT_FOUND, ""),
            AdapterError::NotFound
        ));
    }
}
