//! Score boosters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The multiplier a booster applies to contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoosterKind {
    /// Doubles contribution values.
    Double,
    /// Triples contribution values.
    Triple,
}

impl BoosterKind {
    /// Returns the integer multiplier.
    #[must_use]
    pub fn multiplier(self) -> i64 {
        match self {
            BoosterKind::Double => 2,
            BoosterKind::Triple => 3,
        }
    }

    /// Applies the multiplier to a contribution value.
    #[must_use]
    pub fn apply(self, value: i64) -> i64 {
        value * self.multiplier()
    }
}

/// A temporary score multiplier for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booster {
    /// Display title ("x2 value", "x3 value").
    pub title: String,
    /// The multiplier kind.
    pub kind: BoosterKind,
    /// When the booster expires. Re-stamped at activation.
    pub ends_at: DateTime<Utc>,
    /// Lifetime of the booster once activated, in milliseconds.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::BoosterKind;

    #[test]
    fn test_double_and_triple_multipliers() {
        assert_eq!(BoosterKind::Double.apply(10), 20);
        assert_eq!(BoosterKind::Triple.apply(10), 30);
    }
}
