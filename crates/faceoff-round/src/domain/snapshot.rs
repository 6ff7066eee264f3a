//! The round snapshot — the single mutable entity behind an active round.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::booster::Booster;
use super::side::{PerSide, Side};
use super::target::Target;
use super::types::{Announcement, FeedItem, UserContribution};

/// Running scores, one per side.
pub type Scores = PerSide<i64>;

/// Round outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    /// The host side won.
    Host,
    /// The guest side won.
    Guest,
    /// Scores were level.
    Draw,
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Host => Winner::Host,
            Side::Guest => Winner::Guest,
        }
    }
}

/// Payload of the idle phase, between rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleData {
    /// Whether an invite is outstanding.
    pub invited: bool,
    /// Whether the outstanding invite is a co-host invite.
    pub is_co_host_invite: bool,
    /// Optional invitation message shown to the receiving role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Payload of the active and concluded phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundData {
    /// Running scores.
    pub scores: Scores,
    /// Win-streak counters of the two principals, loaded at round start.
    pub win_streaks: PerSide<u32>,
    /// Top contributors per side, at most three entries each.
    pub leaderboard: PerSide<Vec<UserContribution>>,
    /// Live targets per side.
    pub target: PerSide<Option<Target>>,
    /// Live boosters per side.
    pub booster: PerSide<Option<Booster>>,
    /// Live announcements per side.
    pub announcement: PerSide<Option<Announcement>>,
    /// Overrides the countdown text near the round clock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_text_override: Option<String>,
    /// When the round (or victory lap) ends.
    pub ends_at: DateTime<Utc>,
    /// The outcome, set at conclusion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    /// Whether the round has concluded.
    pub is_finished: bool,
    /// Whether the conclusion was a forfeit.
    pub is_forfeited: bool,
    /// Whether the one extra-time extension has been granted.
    pub extra_time_granted: bool,
    /// Append-only activity feed.
    pub feed: Vec<FeedItem>,
}

impl RoundData {
    /// Seeds a fresh round payload ending at `ends_at`, carrying over
    /// `win_streaks` and the persisted `feed`.
    #[must_use]
    pub fn new(ends_at: DateTime<Utc>, win_streaks: PerSide<u32>, feed: Vec<FeedItem>) -> Self {
        Self {
            scores: Scores::default(),
            win_streaks,
            leaderboard: PerSide::default(),
            target: PerSide::default(),
            booster: PerSide::default(),
            announcement: PerSide::default(),
            timer_text_override: None,
            ends_at,
            winner: None,
            is_finished: false,
            is_forfeited: false,
            extra_time_granted: false,
            feed,
        }
    }
}

/// Phase discriminant, used for expected-phase checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No round is running.
    Idle,
    /// A round is in progress.
    Active,
    /// The round has ended and the victory lap is showing.
    Concluded,
}

/// The stored round state: a phase tag plus its payload.
///
/// Deferred callbacks narrow through [`Phase`]-gated accessors rather than
/// trusting captured state; a callback scheduled under a phase that has
/// since been replaced finds no payload and disarms itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "data", rename_all = "lowercase")]
pub enum RoundPhase {
    /// Between rounds.
    Idle(IdleData),
    /// Round in progress.
    Active(RoundData),
    /// Victory lap.
    Concluded(RoundData),
}

impl RoundPhase {
    /// Returns the phase discriminant.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            RoundPhase::Idle(_) => Phase::Idle,
            RoundPhase::Active(_) => Phase::Active,
            RoundPhase::Concluded(_) => Phase::Concluded,
        }
    }

    /// Returns the round payload if this is the active or concluded phase.
    #[must_use]
    pub fn round_data(&self) -> Option<&RoundData> {
        match self {
            RoundPhase::Idle(_) => None,
            RoundPhase::Active(data) | RoundPhase::Concluded(data) => Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Phase, RoundData, RoundPhase};
    use crate::domain::side::PerSide;

    #[test]
    fn test_round_phase_tag_round_trips_through_json() {
        // Arrange
        let ends_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 2, 0).unwrap();
        let stored = RoundPhase::Active(RoundData::new(ends_at, PerSide::default(), Vec::new()));

        // Act
        let value = serde_json::to_value(&stored).unwrap();
        let restored: RoundPhase = serde_json::from_value(value.clone()).unwrap();

        // Assert
        assert_eq!(value["phase"], "active");
        assert_eq!(restored.phase(), Phase::Active);
        assert_eq!(restored, stored);
    }

    #[test]
    fn test_round_data_accessor_rejects_idle() {
        // Arrange
        let stored = RoundPhase::Idle(super::IdleData::default());

        // Assert
        assert!(stored.round_data().is_none());
    }
}
