//! Domain model for an active round.

pub mod booster;
pub mod side;
pub mod snapshot;
pub mod target;
pub mod types;

pub use booster::{Booster, BoosterKind};
pub use side::{PerSide, Role, Side, SideSelection};
pub use snapshot::{IdleData, Phase, RoundData, RoundPhase, Scores, Winner};
pub use target::{Target, TargetKind};
pub use types::{Announcement, FeedItem, User, UserContribution};
