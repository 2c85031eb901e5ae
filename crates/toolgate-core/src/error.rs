//! Error types for the core crate.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Dispatch error.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors terminating a dispatcher turn.
///
/// Note that errors local to a single tool call (bad arguments, host
/// failures) are not here: those surface as error results inside the
/// turn and the conversation continues.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The task was cancelled by the user.
    #[error("task cancelled")]
    Cancelled,

    /// The model stream reported an error.
    #[error("model stream error: {0}")]
    Stream(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
