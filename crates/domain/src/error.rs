/// Shared error type used across the registration gateway crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("adapter {adapter}: {message}")]
    Adapter { adapter: String, message: String },

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool validation failed for {tool}: {message}")]
    ToolValidation { tool: String, message: String },

    #[error("tool dispatch failed for {tool}: {message}")]
    ToolDispatch { tool: String, message: String },

    #[error("tool loop did not converge after {rounds} rounds")]
    ToolLoop { rounds: u32 },

    #[error("unknown workflow step {0}")]
    UnknownStep(u32),

    #[error("step {0} is not reachable")]
    UnreachableStep(u32),

    #[error("model reply violated the response schema: {0}")]
    SchemaViolation(String),

    #[error("session busy: {0}")]
    SessionBusy(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
