//! Durable store abstraction.
//!
//! Each active round is backed by a single durable key-value store that
//! also owns the round's one deferred alarm. The alarm is the sole source
//! of round-end and victory-lap transitions; firing it is delivered back
//! to the orchestrator as an ordinary inbound event by the hosting layer.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineError;

/// Durable key-value store scoped to one round instance.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>, EngineError>;

    /// Writes `value` under `key`, overwriting any prior value.
    async fn set(&self, key: &str, value: Value) -> Result<(), EngineError>;

    /// Removes the value stored under `key`. Unknown keys are a no-op.
    async fn delete(&self, key: &str) -> Result<(), EngineError>;

    /// Removes every stored value. Used on round reset.
    async fn clear(&self) -> Result<(), EngineError>;

    /// Arms the store's single deferred alarm, replacing any pending one.
    async fn set_alarm(&self, delay: Duration) -> Result<(), EngineError>;

    /// Cancels the pending alarm, if any.
    async fn cancel_alarm(&self) -> Result<(), EngineError>;
}
