//! Error types for the UI edge.

use atome_core::LoggerError;
use thiserror::Error;

/// Errors raised while handling a message from the control surface.
#[derive(Debug, Error)]
pub enum WebViewError {
    /// The message was not valid JSON or did not match any command shape.
    #[error("malformed UI message: {0}")]
    Message(#[from] serde_json::Error),
    /// Opening or closing the diagnostic log failed.
    #[error(transparent)]
    Logging(#[from] LoggerError),
}

/// Result type for UI message handling.
pub type Result<T> = std::result::Result<T, WebViewError>;
