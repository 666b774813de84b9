//! Thin, typed wrappers around the external services the registration
//! engine depends on: the tabular database, the Direct Debit payment
//! vendor, SMS, object storage, and the address-lookup service.
//!
//! None of these vendors are implemented here — each adapter is an HTTP
//! client against a configured base URL, translating vendor responses into
//! [`error::AdapterError`] so the rest of the system never branches on a
//! vendor-specific status code or error string.

pub mod address;
pub mod database;
pub mod error;
pub mod payment;
pub mod sms;
pub mod storage;

pub use address::AddressAdapter;
pub use database::DatabaseAdapter;
pub use error::AdapterError;
pub use payment::PaymentAdapter;
pub use sms::SmsAdapter;
pub use storage::StorageAdapter;

use reg_domain::config::EndpointConfig;
use reg_domain::error::Error;

fn default_client() -> reg_domain::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(28))
        .build()
        .map_err(|e| Error::Http(e.to_string()))
}

/// Read an adapter's credential from the environment variable it names.
/// An endpoint with no `credential_env` configured is allowed (local or
/// mock deployments); one that names a var which is unset or empty is not.
fn resolve_credential(adapter: &str, cfg: &EndpointConfig) -> reg_domain::Result<Option<String>> {
    match &cfg.credential_env {
        None => Ok(None),
        Some(var) => {
            let value = std::env::var(var).map_err(|_| {
                Error::Config(format!("adapter \"{adapter}\": environment variable {var} is not set"))
            })?;
            if value.is_empty() {
                return Err(Error::Config(format!(
                    "adapter \"{adapter}\": environment variable {var} is empty"
                )));
            }
            Ok(Some(value))
        }
    }
}

fn with_auth(req: reqwest::RequestBuilder, credential: &Option<String>) -> reqwest::RequestBuilder {
    match credential {
        Some(token) => req.bearer_auth(token),
        None => req,
    }
}

async fn optional_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> error::Result<Option<T>> {
    if resp.status() == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(error::AdapterError::from_status(status, &text));
    }
    if text.trim().is_empty() || text.trim() == "null" {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| error::AdapterError::Permanent(format!("malformed response: {e}")))
}

async fn empty_or_error(resp: reqwest::Response) -> error::Result<()> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let text = resp.text().await.unwrap_or_default();
    Err(error::AdapterError::from_status(status, &text))
}
