//! Test win-streak store — in-memory `WinStreakStore` implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use faceoff_core::error::EngineError;
use faceoff_core::streaks::WinStreakStore;

/// An in-memory win-streak store with seed and inspection helpers.
#[derive(Debug, Default)]
pub struct MemoryWinStreaks {
    counters: Mutex<HashMap<String, String>>,
}

impl MemoryWinStreaks {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a raw counter value.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, user_id: &str, value: &str) {
        self.counters
            .lock()
            .unwrap()
            .insert(user_id.to_owned(), value.to_owned());
    }

    /// Returns the raw counter value for `user_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn value(&self, user_id: &str) -> Option<String> {
        self.counters.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait]
impl WinStreakStore for MemoryWinStreaks {
    async fn get(&self, user_id: &str) -> Result<Option<String>, EngineError> {
        Ok(self.counters.lock().unwrap().get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, value: String) -> Result<(), EngineError> {
        self.counters
            .lock()
            .unwrap()
            .insert(user_id.to_owned(), value);
        Ok(())
    }
}
