//! Named-timer scheduler.
//!
//! Logical timers are identified by string keys and layered over tokio
//! sleep tasks. A fired task only posts a [`TimerFire`] notification into
//! the owning actor's queue; the continuation itself is stored here as a
//! [`TimerAction`] record and claimed when the notification is processed.
//! Timer continuations therefore never run concurrently with other work,
//! and never capture state: handlers re-fetch the round payload through
//! phase-gated accessors when they run.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::{PerSide, SideSelection};

/// Well-known timer keys.
pub mod keys {
    /// Delays the challenge introduction after round start.
    pub const TARGET_DELAY: &str = "target-delay";
    /// Resolves the live targets at their shared deadline.
    pub const TARGET_END: &str = "target-end";
    /// Clears target slots shortly after resolution.
    pub const TARGET_UPDATE_DELAY: &str = "target-update-delay";
    /// Switches the round clock text when the displayed time runs out.
    pub const ANTI_SNIPE: &str = "anti-sniping-timer-override";

    /// Key of the announcement-expiry timer for a selection.
    #[must_use]
    pub fn announcement_end(selection: super::SideSelection) -> String {
        format!("{}-announcement-end", selection.as_str())
    }

    /// Key of the booster-expiry timer for a selection.
    #[must_use]
    pub fn booster_end(selection: super::SideSelection) -> String {
        format!("{}-booster-end", selection.as_str())
    }
}

/// What to do when a timer fires.
///
/// Continuations are data rather than closures so a fired timer cannot
/// smuggle stale captured state past the phase checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerAction {
    /// Start the chained challenge-introduction announcements.
    ChallengeIntro,
    /// Clear the announcement slots covered by `selection`, then run the
    /// follow-up step of the introduction chain, if any.
    AnnouncementEnd {
        /// Slots to clear.
        selection: SideSelection,
        /// Next step of the chain.
        follow_up: AnnouncementFollowUp,
    },
    /// Resolve the live targets against their reached markers.
    TargetEnd,
    /// Clear target slots and surface "not reached" announcements.
    TargetCleanup {
        /// Which sides had reached their target at resolution.
        reached: PerSide<bool>,
    },
    /// Expire the boosters covered by `selection` and announce totals.
    BoosterEnd {
        /// Slots to expire.
        selection: SideSelection,
    },
    /// Override the round clock text once the displayed time is up.
    AntiSnipe,
}

/// Continuation steps of the challenge-introduction announcement chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementFollowUp {
    /// Nothing further.
    None,
    /// Show the challenge-effect announcement next.
    IntroduceEffect,
    /// Create the challenge target next.
    SpawnTarget,
}

/// Notification that a scheduled timer elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerFire {
    /// The logical timer key.
    pub key: String,
    /// Generation the timer was scheduled under.
    pub generation: u64,
}

struct PendingTimer {
    generation: u64,
    action: TimerAction,
    handle: JoinHandle<()>,
}

/// Named-timer registry feeding one actor queue.
pub struct TimerScheduler {
    tx: mpsc::UnboundedSender<TimerFire>,
    pending: HashMap<String, PendingTimer>,
    next_generation: u64,
}

impl TimerScheduler {
    /// Creates a scheduler and the receiving end of its fire queue.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFire>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                pending: HashMap::new(),
                next_generation: 0,
            },
            rx,
        )
    }

    /// Registers a timer under `key`, firing `action` after `delay`.
    ///
    /// A pending timer under the same key is canceled and replaced
    /// (last-writer-wins).
    pub fn schedule(&mut self, key: &str, delay: Duration, action: TimerAction) {
        if let Some(previous) = self.pending.remove(key) {
            previous.handle.abort();
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let tx = self.tx.clone();
        let fire_key = key.to_owned();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(TimerFire {
                key: fire_key,
                generation,
            });
        });

        self.pending.insert(
            key.to_owned(),
            PendingTimer {
                generation,
                action,
                handle,
            },
        );
    }

    /// Cancels and forgets the timer under `key`. Unknown keys are a no-op.
    pub fn cancel(&mut self, key: &str) {
        if let Some(pending) = self.pending.remove(key) {
            pending.handle.abort();
        }
    }

    /// Cancels the delay of the timer under `key` and hands its action to
    /// the caller for immediate dispatch. `None` if the key is not pending.
    pub fn invoke_early(&mut self, key: &str) -> Option<TimerAction> {
        let pending = self.pending.remove(key)?;
        pending.handle.abort();
        Some(pending.action)
    }

    /// Returns whether a timer is pending under `key`.
    #[must_use]
    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    /// Cancels every pending timer. Used on round reset and forfeit.
    pub fn clear_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.handle.abort();
        }
    }

    /// Claims the action of a fired timer.
    ///
    /// Returns `None` when the fire is stale: the key was canceled,
    /// invoked early, or rescheduled (a newer generation) after the sleep
    /// elapsed but before the notification was processed. Claiming removes
    /// the entry, so a given scheduling fires at most once.
    pub fn claim(&mut self, fire: &TimerFire) -> Option<TimerAction> {
        match self.pending.get(&fire.key) {
            Some(pending) if pending.generation == fire.generation => self
                .pending
                .remove(&fire.key)
                .map(|pending| pending.action),
            _ => None,
        }
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.clear_all();
    }
}
