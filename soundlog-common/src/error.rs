//! Common error types for soundlog

use thiserror::Error;

/// Common result type for soundlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the soundlog services
#[derive(Error, Debug)]
pub enum Error {
    /// Resolved window is empty, inverted, or non-finite; rejected before querying
    #[error("invalid window: {0}")]
    InvalidRange(String),

    /// Event store connection or query failure (wraps sqlx::Error)
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}
