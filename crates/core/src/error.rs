use actix_web::{http::StatusCode, HttpResponse, ResponseError};

/// Platform-wide error type.
///
/// Coordination failures (`LockTimeout`, `CorruptSnapshot`) carry enough
/// detail for the caller to decide between retry and abandon. `NotReady` and
/// `LockTimeout` map to 503 so queue consumers and HTTP clients treat them as
/// retryable.
#[derive(Debug, thiserror::Error)]
pub enum RecoError {
    #[error("Model not ready")]
    NotReady,

    #[error("Could not acquire lock {key} within {waited_ms}ms")]
    LockTimeout { key: String, waited_ms: u64 },

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing API key")]
    Unauthorized,

    #[error("Invalid API key")]
    Forbidden,

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RecoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn redis(err: impl std::fmt::Display) -> Self {
        Self::Redis(err.to_string())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a caller should retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotReady | Self::LockTimeout { .. })
    }
}

impl ResponseError for RecoError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotReady | Self::LockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::CorruptSnapshot(_)
            | Self::Redis(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
            "retryable": self.is_retryable(),
        }))
    }
}
