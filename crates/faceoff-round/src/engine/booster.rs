//! Booster selection.

use chrono::Duration;
use faceoff_core::clock::Clock;
use faceoff_core::rng::RandomSource;

use crate::domain::{Booster, BoosterKind};

/// Probability threshold below which a draw yields the triple booster.
const TRIPLE_THRESHOLD: f64 = 0.1;

/// Draws a scheduled booster: double multiplier at 90%, triple at 10%.
///
/// `ends_at` is provisional here; activation re-stamps it from the clock.
#[must_use]
pub fn draw(rng: &mut dyn RandomSource, clock: &dyn Clock, duration_ms: u64) -> Booster {
    let (kind, title) = if rng.next_f64() > TRIPLE_THRESHOLD {
        (BoosterKind::Double, "x2 value")
    } else {
        (BoosterKind::Triple, "x3 value")
    };
    Booster {
        title: title.to_owned(),
        kind,
        ends_at: clock.now() + Duration::milliseconds(i64::try_from(duration_ms).unwrap_or(0)),
        duration_ms,
    }
}
