//! Error types for pricesync-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid alert condition: {0}")]
    InvalidCondition(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
