//! Phase-gated access to the stored round state.

use std::sync::Arc;

use faceoff_core::error::EngineError;
use faceoff_core::store::DurableStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{Phase, RoundData, RoundPhase};

/// Well-known storage keys.
pub mod keys {
    use crate::domain::Side;

    /// The tagged round state.
    pub const STATE: &str = "state";
    /// Canonical running scores.
    pub const SCORES: &str = "scores";
    /// Per-user contribution totals, per side.
    pub const USER_CONTRIBUTIONS: &str = "user-contributions";
    /// The activity feed.
    pub const FEED: &str = "feed";
    /// Ids of users who already spent their double-tap.
    pub const USERS_DOUBLE_TAPPED: &str = "users-double-tapped";

    /// Marker written when `side` reaches its target.
    #[must_use]
    pub fn reached_target(side: Side) -> String {
        format!("{side}-target")
    }

    /// Set of user ids counted toward `side`'s unique-contributor target.
    #[must_use]
    pub fn target_contributors(side: Side) -> String {
        format!("{side}-target-users-contributed")
    }

    /// Score baseline snapshotted for `side` at target creation.
    #[must_use]
    pub fn score_baseline(side: Side) -> String {
        format!("{side}-score-before-target")
    }
}

/// Typed accessor over the round's durable store.
///
/// All round-state mutation is read-modify-write through [`update`] or
/// [`replace`]; `update` is gated on the expected phase, and a mismatch is
/// a silent skip — the formal "state changed underneath us" signal for
/// deferred callbacks resuming after intervening mutations.
///
/// [`update`]: RoundStateStore::update
/// [`replace`]: RoundStateStore::replace
#[derive(Clone)]
pub struct RoundStateStore {
    store: Arc<dyn DurableStore>,
}

impl RoundStateStore {
    /// Wraps a durable store.
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn raw(&self) -> &Arc<dyn DurableStore> {
        &self.store
    }

    /// Reads the stored tagged state, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or deserialization fails.
    pub async fn phase(&self) -> Result<Option<RoundPhase>, EngineError> {
        self.read_key(keys::STATE).await
    }

    /// Returns the round payload iff the stored phase matches `expected`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or deserialization fails.
    pub async fn round(&self, expected: Phase) -> Result<Option<RoundData>, EngineError> {
        let Some(stored) = self.phase().await? else {
            return Ok(None);
        };
        if stored.phase() != expected {
            return Ok(None);
        }
        Ok(stored.round_data().cloned())
    }

    /// Mutates the round payload iff the stored phase matches `expected`,
    /// writing the result back under the same phase tag. Returns the
    /// updated payload, or `None` when the phase was stale and nothing was
    /// written.
    ///
    /// # Errors
    ///
    /// Returns an error if the read, the write, or (de)serialization fails.
    pub async fn update(
        &self,
        expected: Phase,
        mutate: impl FnOnce(&mut RoundData),
    ) -> Result<Option<RoundData>, EngineError> {
        let Some(stored) = self.phase().await? else {
            return Ok(None);
        };
        let rebuild = match (expected, stored) {
            (Phase::Active, RoundPhase::Active(mut data)) => {
                mutate(&mut data);
                RoundPhase::Active(data)
            }
            (Phase::Concluded, RoundPhase::Concluded(mut data)) => {
                mutate(&mut data);
                RoundPhase::Concluded(data)
            }
            _ => return Ok(None),
        };
        self.write_key(keys::STATE, &rebuild).await?;
        Ok(rebuild.round_data().cloned())
    }

    /// Mutates the round payload in whichever of the active or concluded
    /// phases is current. Used for writes that are legal during the
    /// victory lap, such as feed appends.
    ///
    /// # Errors
    ///
    /// Returns an error if the read, the write, or (de)serialization fails.
    pub async fn update_round(
        &self,
        mutate: impl FnOnce(&mut RoundData),
    ) -> Result<Option<RoundData>, EngineError> {
        let phase = match self.phase().await? {
            Some(stored) => stored.phase(),
            None => return Ok(None),
        };
        match phase {
            Phase::Idle => Ok(None),
            Phase::Active | Phase::Concluded => self.update(phase, mutate).await,
        }
    }

    /// Unconditionally writes `state`, used for phase transitions.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or serialization fails.
    pub async fn replace(&self, state: &RoundPhase) -> Result<(), EngineError> {
        self.write_key(keys::STATE, state).await
    }

    /// Reads and deserializes the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read or deserialization fails.
    pub async fn read_key<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, EngineError> {
        match self.store.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serializes and writes `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write or serialization fails.
    pub async fn write_key<T: Serialize>(&self, key: &str, value: &T) -> Result<(), EngineError> {
        self.store.set(key, serde_json::to_value(value)?).await
    }

    /// Removes the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn remove_key(&self, key: &str) -> Result<(), EngineError> {
        self.store.delete(key).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use faceoff_test_support::MemoryStore;

    use super::{keys, RoundStateStore};
    use crate::domain::{IdleData, PerSide, Phase, RoundData, RoundPhase, Side};

    fn active_state() -> RoundPhase {
        let ends_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 2, 0).unwrap();
        RoundPhase::Active(RoundData::new(ends_at, PerSide::default(), Vec::new()))
    }

    #[tokio::test]
    async fn test_round_returns_payload_only_for_matching_phase() {
        // Arrange
        let state = RoundStateStore::new(Arc::new(MemoryStore::new()));
        state.replace(&active_state()).await.unwrap();

        // Act / Assert
        assert!(state.round(Phase::Active).await.unwrap().is_some());
        assert!(state.round(Phase::Concluded).await.unwrap().is_none());
        assert!(state.round(Phase::Idle).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_with_stale_phase_is_a_silent_skip() {
        // Arrange
        let state = RoundStateStore::new(Arc::new(MemoryStore::new()));
        state
            .replace(&RoundPhase::Idle(IdleData::default()))
            .await
            .unwrap();

        // Act
        let written = state
            .update(Phase::Active, |data| data.scores.host += 1)
            .await
            .unwrap();

        // Assert
        assert!(written.is_none());
        let stored = state.phase().await.unwrap().unwrap();
        assert_eq!(stored.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_update_rereads_latest_stored_payload_before_writing() {
        // Arrange
        let state = RoundStateStore::new(Arc::new(MemoryStore::new()));
        state.replace(&active_state()).await.unwrap();
        state
            .update(Phase::Active, |data| data.scores.guest = 20)
            .await
            .unwrap();

        // Act
        let updated = state
            .update(Phase::Active, |data| data.scores.host = 15)
            .await
            .unwrap()
            .unwrap();

        // Assert: the first write is still visible in the second.
        assert_eq!(updated.scores.guest, 20);
        assert_eq!(updated.scores.host, 15);
    }

    #[tokio::test]
    async fn test_update_round_accepts_concluded_but_not_idle() {
        // Arrange
        let state = RoundStateStore::new(Arc::new(MemoryStore::new()));
        let RoundPhase::Active(data) = active_state() else {
            unreachable!()
        };
        state
            .replace(&RoundPhase::Concluded(data))
            .await
            .unwrap();

        // Act
        let updated = state
            .update_round(|data| data.scores.host = 1)
            .await
            .unwrap();

        // Assert
        assert_eq!(updated.unwrap().scores.host, 1);
        let side_key = keys::reached_target(Side::Host);
        assert_eq!(side_key, "host-target");
    }
}
