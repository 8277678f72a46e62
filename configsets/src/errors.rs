use crate::queue::QueueError;
use crate::store::StoreError;
use http::StatusCode;
use thiserror::Error;

/// Result type alias for configset operations
pub type Result<T, E = ConfigSetError> = std::result::Result<T, E>;

/// Error classification surfaced to callers, mirroring the numeric codes the
/// queue workers report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    UnsupportedMediaType,
    ServerError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Sentinel used by workers when no specific code applies.
    pub const UNSET: i64 = -1;

    /// Translates a worker-reported numeric code. Absent, sentinel and unknown
    /// codes all become `ServerError`.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(400) => ErrorCode::BadRequest,
            Some(401) => ErrorCode::Unauthorized,
            Some(403) => ErrorCode::Forbidden,
            Some(404) => ErrorCode::NotFound,
            Some(409) => ErrorCode::Conflict,
            Some(415) => ErrorCode::UnsupportedMediaType,
            Some(503) => ErrorCode::ServiceUnavailable,
            _ => ErrorCode::ServerError,
        }
    }

    pub const fn code(&self) -> u16 {
        match self {
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::Conflict => 409,
            ErrorCode::UnsupportedMediaType => 415,
            ErrorCode::ServerError => 500,
            ErrorCode::ServiceUnavailable => 503,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Errors that can occur while handling a configset request
#[derive(Error, Debug)]
pub enum ConfigSetError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ServerError(String),

    /// Failure reported by the worker that applied the queued operation
    #[error("{msg}")]
    Remote { code: ErrorCode, msg: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

impl ConfigSetError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ConfigSetError::BadRequest(msg.into())
    }

    pub fn server_error(msg: impl Into<String>) -> Self {
        ConfigSetError::ServerError(msg.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigSetError::BadRequest(_) => ErrorCode::BadRequest,
            ConfigSetError::Unauthorized(_) => ErrorCode::Unauthorized,
            ConfigSetError::ServerError(_) => ErrorCode::ServerError,
            ConfigSetError::Remote { code, .. } => *code,
            ConfigSetError::Store(e) if e.is_client_error() => ErrorCode::BadRequest,
            ConfigSetError::Store(_) => ErrorCode::ServerError,
            ConfigSetError::Queue(_) => ErrorCode::ServerError,
        }
    }
}
