//! Time-boxed targets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::booster::Booster;

/// What a target counts toward its goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Accumulated effective contribution value.
    CumulativeScore,
    /// Number of distinct contributing users.
    UniqueContributors,
}

/// A time-boxed sub-challenge issued to one side (or both, as copies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Display title.
    pub title: String,
    /// Progress semantics.
    pub kind: TargetKind,
    /// Progress so far.
    pub current_value: i64,
    /// Goal value.
    pub target_value: i64,
    /// Deadline after which the target resolves.
    pub ends_at: DateTime<Utc>,
    /// The booster granted if the goal is reached in time.
    pub booster: Booster,
}

impl Target {
    /// Returns whether the goal has been met.
    #[must_use]
    pub fn is_reached(&self) -> bool {
        self.current_value >= self.target_value
    }
}
