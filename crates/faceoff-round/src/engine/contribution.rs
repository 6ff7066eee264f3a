//! Contribution scoring.

use faceoff_core::error::EngineError;

use crate::domain::{Booster, PerSide, Scores, Side, User, UserContribution};
use crate::state::{keys, RoundStateStore};

/// Result of applying one contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedContribution {
    /// The contribution value after any booster multiplier.
    pub effective_value: i64,
    /// Both sides' scores after the contribution.
    pub scores: Scores,
}

/// Applies a contribution of `raw_value` from `user` to `side`.
///
/// The effective value is the raw value passed through `booster`'s
/// multiplier when one is live for that side. Adds to the canonical
/// scores, then upserts the user's per-side contribution total (created
/// lazily at zero on first contribution).
///
/// # Errors
///
/// Returns an error if a store read or write fails.
pub async fn apply(
    state: &RoundStateStore,
    user: &User,
    side: Side,
    raw_value: i64,
    booster: Option<&Booster>,
) -> Result<AppliedContribution, EngineError> {
    let effective_value = match booster {
        Some(booster) => booster.kind.apply(raw_value),
        None => raw_value,
    };

    let mut scores: Scores = state.read_key(keys::SCORES).await?.unwrap_or_default();
    *scores.get_mut(side) += effective_value;
    state.write_key(keys::SCORES, &scores).await?;

    let mut contributions: PerSide<Vec<UserContribution>> = state
        .read_key(keys::USER_CONTRIBUTIONS)
        .await?
        .unwrap_or_default();
    let side_contributions = contributions.get_mut(side);
    match side_contributions
        .iter()
        .position(|entry| entry.user.id == user.id)
    {
        Some(index) => side_contributions[index].score += effective_value,
        None => side_contributions.push(UserContribution {
            user: user.clone(),
            score: effective_value,
        }),
    }
    state
        .write_key(keys::USER_CONTRIBUTIONS, &contributions)
        .await?;

    Ok(AppliedContribution {
        effective_value,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use faceoff_test_support::MemoryStore;

    use super::apply;
    use crate::domain::{Booster, BoosterKind, PerSide, Scores, Side, User, UserContribution};
    use crate::state::{keys, RoundStateStore};

    fn state() -> RoundStateStore {
        RoundStateStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_unboosted_scores_sum_contribution_values() {
        // Arrange
        let state = state();
        let ada = User::new("u1", "ada");
        let ben = User::new("u2", "ben");

        // Act
        apply(&state, &ada, Side::Host, 10, None).await.unwrap();
        apply(&state, &ben, Side::Host, 5, None).await.unwrap();
        let applied = apply(&state, &ada, Side::Guest, 20, None).await.unwrap();

        // Assert
        assert_eq!(applied.scores, Scores { host: 15, guest: 20 });
    }

    #[tokio::test]
    async fn test_booster_multiplies_only_the_boosted_contribution() {
        // Arrange
        let state = state();
        let ada = User::new("u1", "ada");
        let booster = Booster {
            title: "x2 value".to_owned(),
            kind: BoosterKind::Double,
            ends_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 30).unwrap(),
            duration_ms: 30_000,
        };

        // Act
        apply(&state, &ada, Side::Host, 10, None).await.unwrap();
        let boosted = apply(&state, &ada, Side::Host, 10, Some(&booster))
            .await
            .unwrap();
        let after = apply(&state, &ada, Side::Host, 10, None).await.unwrap();

        // Assert: 10 + 20 + 10, not 60.
        assert_eq!(boosted.effective_value, 20);
        assert_eq!(after.scores.host, 40);
    }

    #[tokio::test]
    async fn test_contribution_totals_upsert_per_user_in_arrival_order() {
        // Arrange
        let state = state();
        let ada = User::new("u1", "ada");
        let ben = User::new("u2", "ben");

        // Act
        apply(&state, &ada, Side::Guest, 3, None).await.unwrap();
        apply(&state, &ben, Side::Guest, 4, None).await.unwrap();
        apply(&state, &ada, Side::Guest, 2, None).await.unwrap();

        // Assert
        let contributions: PerSide<Vec<UserContribution>> = state
            .read_key(keys::USER_CONTRIBUTIONS)
            .await
            .unwrap()
            .unwrap();
        let guest = &contributions.guest;
        assert_eq!(guest.len(), 2);
        assert_eq!(guest[0].user.id, "u1");
        assert_eq!(guest[0].score, 5);
        assert_eq!(guest[1].user.id, "u2");
        assert_eq!(guest[1].score, 4);
    }
}
