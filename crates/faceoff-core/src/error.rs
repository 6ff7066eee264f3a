//! Engine error types.

use thiserror::Error;

/// Top-level error type for the round engine.
///
/// Nothing in the engine is user-fatal: handlers surface these so callers
/// can log and keep the round responsive, never to abort it.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A durable-store operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored payload failed to (de)serialize.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A validation error in round logic.
    #[error("validation error: {0}")]
    Validation(String),
}
