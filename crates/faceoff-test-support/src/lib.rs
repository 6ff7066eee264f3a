//! Faceoff Test Support — deterministic doubles for engine tests.

mod channel;
mod clock;
mod rng;
mod store;
mod streaks;

pub use channel::{RecordedPush, RecordingChannel};
pub use clock::{AdjustableClock, FixedClock};
pub use rng::{MockRandom, SequenceRandom};
pub use store::{FailingStore, MemoryStore};
pub use streaks::MemoryWinStreaks;
