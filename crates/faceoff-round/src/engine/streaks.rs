//! Win-streak ledger.

use std::sync::Arc;

use faceoff_core::streaks::WinStreakStore;

use crate::domain::PerSide;

/// Consecutive-win counters backed by the cross-round store.
///
/// Ledger writes are two independent key updates with no cross-key
/// atomicity; a partial failure leaves a wrong streak count, which is
/// tolerated rather than retried since it must never block round
/// progression.
#[derive(Clone)]
pub struct WinStreakLedger {
    store: Arc<dyn WinStreakStore>,
}

impl WinStreakLedger {
    /// Wraps a win-streak store.
    #[must_use]
    pub fn new(store: Arc<dyn WinStreakStore>) -> Self {
        Self { store }
    }

    /// Loads both principals' counters. A missing principal, an absent
    /// key, a read failure, or a non-numeric value all normalize to zero.
    pub async fn load(&self, host_id: Option<&str>, guest_id: Option<&str>) -> PerSide<u32> {
        PerSide {
            host: self.read(host_id).await,
            guest: self.read(guest_id).await,
        }
    }

    /// Records a decisive outcome: the winner's counter is incremented
    /// from `winner_current`, the loser's is written to zero.
    pub async fn record(&self, winner_id: &str, winner_current: u32, loser_id: &str) {
        self.write(winner_id, winner_current + 1).await;
        self.write(loser_id, 0).await;
    }

    /// Zeroes one user's counter. Used for the departing side on forfeit.
    pub async fn reset(&self, user_id: &str) {
        self.write(user_id, 0).await;
    }

    async fn read(&self, user_id: Option<&str>) -> u32 {
        let Some(user_id) = user_id else { return 0 };
        match self.store.get(user_id).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(error) => {
                tracing::warn!(user_id, %error, "win streak read failed, assuming 0");
                0
            }
        }
    }

    async fn write(&self, user_id: &str, value: u32) {
        if let Err(error) = self.store.put(user_id, value.to_string()).await {
            tracing::warn!(user_id, value, %error, "win streak write failed");
        }
    }
}
