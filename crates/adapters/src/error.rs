use std::time::Duration;

/// Local error taxonomy every adapter maps vendor-specific failures into.
///
/// The workflow engine only ever branches on this shape, never on a vendor's
/// own status codes or error strings.
#[derive(thiserror::Error, Debug, Clone)]
pub enum AdapterError {
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Permanent(String),
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, AdapterError>;

impl AdapterError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if status == reqwest::StatusCode::NOT_FOUND {
            AdapterError::NotFound
        } else if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY || status == reqwest::StatusCode::BAD_REQUEST {
            AdapterError::Validation(body.to_string())
        } else if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            AdapterError::Transient(format!("HTTP {status}: {body}"))
        } else {
            AdapterError::Permanent(format!("HTTP {status}: {body}"))
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            AdapterError::Transient(e.to_string())
        } else {
            AdapterError::Permanent(e.to_string())
        }
    }
}

impl From<AdapterError> for reg_domain::Error {
    fn from(e: AdapterError) -> Self {
        reg_domain::Error::Adapter {
            adapter: "external".into(),
            message: e.to_string(),
        }
    }
}

/// Retry a fallible async operation at fixed delays, retrying only on
/// [`AdapterError::Transient`]. Used for the idempotent-write and SMS retry
/// policies, which specify fixed (not exponential) delay schedules.
pub async fn retry_fixed<F, Fut, T>(delays: &[Duration], mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0usize;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(AdapterError::Transient(msg)) => {
                if attempt >= delays.len() {
                    return Err(AdapterError::Transient(msg));
                }
                tokio::time::sleep(delays[attempt]).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
