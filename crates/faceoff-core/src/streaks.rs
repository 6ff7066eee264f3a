//! Win-streak store abstraction.
//!
//! Consecutive-win counters live outside the round store so they survive
//! across rounds. Values are opaque strings at this boundary; callers
//! normalize absent or non-numeric values to zero.

use async_trait::async_trait;

use crate::error::EngineError;

/// Cross-round key-value store holding per-user win-streak counters.
#[async_trait]
pub trait WinStreakStore: Send + Sync {
    /// Reads the raw counter for `user_id`, if present.
    async fn get(&self, user_id: &str) -> Result<Option<String>, EngineError>;

    /// Writes the raw counter for `user_id`.
    async fn put(&self, user_id: &str, value: String) -> Result<(), EngineError>;
}
