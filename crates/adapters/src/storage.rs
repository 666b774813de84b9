//! Object storage adapter.
//!
//! HEIC transcoding to JPEG happens upstream, in the photo pipeline's
//! optimisation step, because the `image` crate this codebase already
//! depends on has no HEIC decoder. This adapter validates the incoming
//! content type and rejects HEIC bytes with a message telling the caller
//! to transcode first, rather than silently accepting bytes it cannot
//! actually forward as JPEG.

use crate::error::{AdapterError, Result};
use reg_domain::config::EndpointConfig;

pub const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

pub struct StorageAdapter {
    client: reqwest::Client,
    base_url: String,
    credential: Option<String>,
}

impl StorageAdapter {
    pub fn from_config(cfg: &EndpointConfig) -> reg_domain::Result<Self> {
        let credential = super::resolve_credential("storage", cfg)?;
        Ok(Self {
            client: super::default_client()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    pub async fn put_image(&self, bytes: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        if content_type == "image/heic" {
            return Err(AdapterError::Validation(
                "HEIC bytes must be transcoded to JPEG before put_image".into(),
            ));
        }
        if !ACCEPTED_CONTENT_TYPES.contains(&content_type) {
            return Err(AdapterError::Validation(format!(
                "unsupported content type: {content_type}"
            )));
        }

        let req = self
            .client
            .put(format!("{}/objects/{key}", self.base_url))
            .header("Content-Type", content_type)
            .body(bytes);
        let resp = super::with_auth(req, &self.credential).send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AdapterError::from_status(status, &text));
        }
        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AdapterError::Permanent(format!("malformed response: {e}")))?;
        body.get("url")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| AdapterError::Permanent("response missing url".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_content_types_excludes_heic() {
        assert!(!ACCEPTED_CONTENT_TYPES.contains(&"image/heic"));
        assert!(ACCEPTED_CONTENT_TYPES.contains(&"image/jpeg"));
    }
}
