//! Target progress and challenge drawing.

use faceoff_core::error::EngineError;
use faceoff_core::rng::RandomSource;

use crate::config::RoundConfig;
use crate::domain::{Side, Target, TargetKind};
use crate::state::{keys, RoundStateStore};

/// Advances `target` for a contribution by `user_id` worth
/// `effective_value`. Returns whether the contribution counted:
/// cumulative-score targets always count, unique-contributor targets count
/// a given user only once (tracked in the durable per-side set).
///
/// # Errors
///
/// Returns an error if a store read or write fails.
pub async fn advance(
    state: &RoundStateStore,
    target: &mut Target,
    side: Side,
    user_id: &str,
    effective_value: i64,
) -> Result<bool, EngineError> {
    match target.kind {
        TargetKind::CumulativeScore => {
            target.current_value += effective_value;
            Ok(true)
        }
        TargetKind::UniqueContributors => {
            let key = keys::target_contributors(side);
            let mut contributed: Vec<String> = state.read_key(&key).await?.unwrap_or_default();
            if contributed.iter().any(|id| id == user_id) {
                return Ok(false);
            }
            contributed.push(user_id.to_owned());
            state.write_key(&key, &contributed).await?;
            target.current_value += 1;
            Ok(true)
        }
    }
}

/// Parameters of a drawn challenge, before the target is materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeSpec {
    /// Display title.
    pub title: String,
    /// Progress semantics.
    pub kind: TargetKind,
    /// Goal value.
    pub target_value: i64,
    /// Length of the challenge window, in milliseconds.
    pub window_ms: u64,
}

/// Draws the challenge type for this round's introduction: a
/// cumulative-score "speed challenge" or a unique-contributors "gifter
/// challenge", with even odds. Goals scale with the connected audience.
#[must_use]
pub fn draw_challenge(
    rng: &mut dyn RandomSource,
    viewers: usize,
    config: &RoundConfig,
) -> ChallengeSpec {
    let viewers = i64::try_from(viewers).unwrap_or(0);
    if rng.next_f64() < 0.5 {
        ChallengeSpec {
            title: "speed challenge".to_owned(),
            kind: TargetKind::CumulativeScore,
            target_value: config.score_challenge_floor.max(viewers * 10 + 200),
            window_ms: config.score_challenge_window_ms,
        }
    } else {
        ChallengeSpec {
            title: "gifter challenge".to_owned(),
            kind: TargetKind::UniqueContributors,
            target_value: 2.max(viewers / 5),
            window_ms: config.gifter_challenge_window_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use faceoff_test_support::{MemoryStore, SequenceRandom};

    use super::{advance, draw_challenge};
    use crate::config::RoundConfig;
    use crate::domain::{Booster, BoosterKind, Side, Target, TargetKind};
    use crate::state::RoundStateStore;

    fn target(kind: TargetKind, target_value: i64) -> Target {
        Target {
            title: "test".to_owned(),
            kind,
            current_value: 0,
            target_value,
            ends_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 15).unwrap(),
            booster: Booster {
                title: "x2 value".to_owned(),
                kind: BoosterKind::Double,
                ends_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 45).unwrap(),
                duration_ms: 30_000,
            },
        }
    }

    #[tokio::test]
    async fn test_cumulative_target_accumulates_contribution_values() {
        // Arrange
        let state = RoundStateStore::new(Arc::new(MemoryStore::new()));
        let mut target = target(TargetKind::CumulativeScore, 100);

        // Act
        for _ in 0..4 {
            let counted = advance(&state, &mut target, Side::Host, "u1", 7)
                .await
                .unwrap();
            assert!(counted);
        }

        // Assert
        assert_eq!(target.current_value, 28);
    }

    #[tokio::test]
    async fn test_unique_target_counts_each_user_once() {
        // Arrange
        let state = RoundStateStore::new(Arc::new(MemoryStore::new()));
        let mut target = target(TargetKind::UniqueContributors, 3);

        // Act
        let first = advance(&state, &mut target, Side::Guest, "u1", 5)
            .await
            .unwrap();
        let repeat = advance(&state, &mut target, Side::Guest, "u1", 5)
            .await
            .unwrap();
        let other = advance(&state, &mut target, Side::Guest, "u2", 5)
            .await
            .unwrap();

        // Assert: K contributions from the same user count as one.
        assert!(first);
        assert!(!repeat);
        assert!(other);
        assert_eq!(target.current_value, 2);
    }

    #[tokio::test]
    async fn test_unique_tracking_is_per_side() {
        // Arrange
        let state = RoundStateStore::new(Arc::new(MemoryStore::new()));
        let mut host_target = target(TargetKind::UniqueContributors, 3);
        let mut guest_target = target(TargetKind::UniqueContributors, 3);

        // Act
        advance(&state, &mut host_target, Side::Host, "u1", 5)
            .await
            .unwrap();
        let guest_counted = advance(&state, &mut guest_target, Side::Guest, "u1", 5)
            .await
            .unwrap();

        // Assert
        assert!(guest_counted);
        assert_eq!(guest_target.current_value, 1);
    }

    #[test]
    fn test_challenge_goals_scale_with_audience() {
        // Arrange
        let config = RoundConfig::default();
        let mut rng = SequenceRandom::with_floats(vec![0.0, 0.0, 0.9]);

        // Act
        let small = draw_challenge(&mut rng, 10, &config);
        let large = draw_challenge(&mut rng, 100, &config);
        let gifter = draw_challenge(&mut rng, 40, &config);

        // Assert
        assert_eq!(small.kind, TargetKind::CumulativeScore);
        assert_eq!(small.target_value, 500);
        assert_eq!(large.target_value, 1_200);
        assert_eq!(gifter.kind, TargetKind::UniqueContributors);
        assert_eq!(gifter.target_value, 8);
        assert_eq!(gifter.title, "gifter challenge");
    }
}
