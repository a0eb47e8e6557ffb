//! Fallback error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FallbackResult<T> = Result<T, FallbackError>;
