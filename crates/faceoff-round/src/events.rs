//! Inbound events and outbound pushes at the transport seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Announcement, Booster, PerSide, Role, RoundPhase, Scores, Side, User, UserContribution,
};
use crate::timer::TimerFire;

/// An inbound unit of work for the orchestrator.
///
/// The hosting platform's session dispatcher delivers these; the store
/// alarm and internal timers re-enter through the same queue, so every
/// variant is handled strictly one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// Start a round: the invite was accepted or the streamer started.
    Start,
    /// A point-valued contribution (a gift-equivalent) for `side`.
    Contribution {
        /// Side the contribution benefits.
        side: Side,
        /// Contributing user.
        user_id: String,
        /// Raw point value before any booster.
        value: i64,
        /// Optional display label of the contributed item.
        label: Option<String>,
    },
    /// A double-tap for `side`; worth a small fixed value, once per user.
    Tap {
        /// Side the tap benefits.
        side: Side,
        /// Tapping user.
        user_id: String,
    },
    /// A session connected.
    Connect {
        /// Role assigned by the platform.
        role: Role,
        /// The connecting user.
        user: User,
    },
    /// A session disconnected.
    Disconnect {
        /// Role of the departing session.
        role: Role,
    },
    /// The invited opponent declined.
    DeclineInvite {
        /// Role of the declining session.
        role: Role,
    },
    /// Reset to idle for a rematch.
    Restart {
        /// Role that requested the restart.
        role: Role,
    },
    /// The durable store's deferred alarm fired.
    Alarm,
    /// An internal timer elapsed.
    Timer(TimerFire),
}

/// An outbound message to connected viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum OutboundPush {
    /// Full-state snapshot; the feed is embedded here, never pushed
    /// incrementally.
    SetState(RoundPhase),
    /// Incremental score update.
    UpdateScores(Scores),
    /// Booster slots changed.
    UpdateBooster(PerSide<Option<Booster>>),
    /// Leaderboard changed.
    UpdateLeaderboard(PerSide<Vec<UserContribution>>),
    /// Announcement slots changed.
    AnnounceTarget(PerSide<Option<Announcement>>),
    /// Acknowledges (or resets) a viewer's double-tap.
    SetDoubleTapped(bool),
    /// The rematch/first invite was declined.
    InviteDeclined,
}

/// Outbound fan-out to the round's connected sessions.
///
/// Implementations route by role or user id; a push addressed to a
/// session that is not connected is silently skipped — durable state has
/// already been mutated and the next full sync repairs the view.
#[async_trait]
pub trait RoundChannel: Send + Sync {
    /// Sends `push` to every connected session.
    async fn broadcast(&self, push: OutboundPush);

    /// Sends `push` to the session holding `role`, if connected.
    async fn send_to_role(&self, role: Role, push: OutboundPush);

    /// Sends `push` to `user_id`'s session, if connected.
    async fn send_to_user(&self, user_id: &str, push: OutboundPush);
}
