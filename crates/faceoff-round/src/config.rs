//! Round tuning configuration.

use std::time::Duration;

use faceoff_core::error::EngineError;
use serde::{Deserialize, Serialize};

/// Tunable durations and values for a round.
///
/// Defaults carry the production tuning; tests and the simulator shrink
/// them to keep scenarios fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Length of the competitive portion of a round.
    pub round_duration_ms: u64,
    /// How long the concluded snapshot stays up after the round ends.
    pub victory_lap_ms: u64,
    /// Slack between the displayed round end and the round-end alarm.
    pub alarm_grace_ms: u64,
    /// Score value of one double-tap.
    pub double_tap_value: i64,
    /// Lifetime of an activated booster.
    pub booster_duration_ms: u64,
    /// Slack between a target's displayed deadline and its resolution.
    pub target_end_grace_ms: u64,
    /// Delay between target resolution and clearing the target slots.
    pub target_cleanup_delay_ms: u64,
    /// Window of a cumulative-score challenge.
    pub score_challenge_window_ms: u64,
    /// Window of a unique-contributors challenge.
    pub gifter_challenge_window_ms: u64,
    /// Minimum goal of a cumulative-score challenge.
    pub score_challenge_floor: i64,
    /// Earliest the challenge introduction may start after round start.
    pub challenge_intro_min_ms: u64,
    /// Latest the challenge introduction may start after round start.
    pub challenge_intro_max_ms: u64,
    /// Display duration of ordinary announcements.
    pub announcement_ms: u64,
    /// Display duration of the "target reached" announcement.
    pub reached_announcement_ms: u64,
    /// Display duration of the boosted-points summary announcement.
    pub boost_summary_ms: u64,
    /// Extension window granted once when the round ends in a draw;
    /// `None` disables extra time and draws stand.
    pub extra_time_ms: Option<u64>,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            round_duration_ms: 120_000,
            victory_lap_ms: 12_000,
            alarm_grace_ms: 3_000,
            double_tap_value: 3,
            booster_duration_ms: 30_000,
            target_end_grace_ms: 500,
            target_cleanup_delay_ms: 1_000,
            score_challenge_window_ms: 15_000,
            gifter_challenge_window_ms: 40_000,
            score_challenge_floor: 500,
            challenge_intro_min_ms: 15_000,
            challenge_intro_max_ms: 45_000,
            announcement_ms: 3_000,
            reached_announcement_ms: 30_000,
            boost_summary_ms: 5_000,
            extra_time_ms: Some(30_000),
        }
    }
}

impl RoundConfig {
    /// Round duration as a [`Duration`].
    #[must_use]
    pub fn round_duration(&self) -> Duration {
        Duration::from_millis(self.round_duration_ms)
    }

    /// Round-end alarm delay: round duration plus grace.
    #[must_use]
    pub fn alarm_delay(&self) -> Duration {
        Duration::from_millis(self.round_duration_ms + self.alarm_grace_ms)
    }

    /// Victory lap as a [`Duration`].
    #[must_use]
    pub fn victory_lap(&self) -> Duration {
        Duration::from_millis(self.victory_lap_ms)
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Validation` when a field combination cannot
    /// produce a playable round.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.round_duration_ms == 0 {
            return Err(EngineError::Validation(
                "round_duration_ms must be positive".to_owned(),
            ));
        }
        if self.challenge_intro_min_ms > self.challenge_intro_max_ms {
            return Err(EngineError::Validation(
                "challenge_intro_min_ms exceeds challenge_intro_max_ms".to_owned(),
            ));
        }
        Ok(())
    }
}
