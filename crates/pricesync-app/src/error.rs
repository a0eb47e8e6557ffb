//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] pricesync_core::CoreError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] pricesync_ws::WsError),

    #[error("Fallback error: {0}")]
    Fallback(#[from] pricesync_fallback::FallbackError),
}

pub type AppResult<T> = Result<T, AppError>;
