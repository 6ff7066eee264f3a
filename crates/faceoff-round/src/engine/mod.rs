//! Scoring, target, booster, leaderboard, and win-streak logic.

pub mod booster;
pub mod contribution;
pub mod leaderboard;
pub mod streaks;
pub mod target;
