//! Test stores — in-memory `DurableStore` implementations.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use faceoff_core::error::EngineError;
use faceoff_core::store::DurableStore;
use serde_json::Value;

/// An in-memory durable store. The alarm is recorded, never fired — tests
/// deliver the alarm event themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<String, Value>>,
    alarm: Mutex<Option<Duration>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value stored under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        self.data.lock().unwrap().get(key).cloned()
    }

    /// Returns the keys currently stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn stored_keys(&self) -> Vec<String> {
        self.data.lock().unwrap().keys().cloned().collect()
    }

    /// Returns the delay of the pending alarm, if one is armed.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn alarm_delay(&self) -> Option<Duration> {
        *self.alarm.lock().unwrap()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, EngineError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), EngineError> {
        self.data.lock().unwrap().insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), EngineError> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), EngineError> {
        self.data.lock().unwrap().clear();
        Ok(())
    }

    async fn set_alarm(&self, delay: Duration) -> Result<(), EngineError> {
        *self.alarm.lock().unwrap() = Some(delay);
        Ok(())
    }

    async fn cancel_alarm(&self) -> Result<(), EngineError> {
        *self.alarm.lock().unwrap() = None;
        Ok(())
    }
}

/// A durable store that fails every operation. Useful for testing that
/// failure paths degrade instead of wedging the round.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl DurableStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, EngineError> {
        Err(EngineError::Storage("store unavailable".into()))
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), EngineError> {
        Err(EngineError::Storage("store unavailable".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), EngineError> {
        Err(EngineError::Storage("store unavailable".into()))
    }

    async fn clear(&self) -> Result<(), EngineError> {
        Err(EngineError::Storage("store unavailable".into()))
    }

    async fn set_alarm(&self, _delay: Duration) -> Result<(), EngineError> {
        Err(EngineError::Storage("store unavailable".into()))
    }

    async fn cancel_alarm(&self) -> Result<(), EngineError> {
        Err(EngineError::Storage("store unavailable".into()))
    }
}
