//! Test channel — a `RoundChannel` that records every push.

use std::sync::Mutex;

use async_trait::async_trait;
use faceoff_round::domain::Role;
use faceoff_round::events::{OutboundPush, RoundChannel};

/// One recorded outbound push with its addressing.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedPush {
    /// Sent to every connected session.
    Broadcast(OutboundPush),
    /// Sent to the session holding a role.
    ToRole(Role, OutboundPush),
    /// Sent to one user's session.
    ToUser(String, OutboundPush),
}

/// A channel that records all pushes for inspection.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    pushes: Mutex<Vec<RecordedPush>>,
}

impl RecordingChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every recorded push, in send order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn all(&self) -> Vec<RecordedPush> {
        self.pushes.lock().unwrap().clone()
    }

    /// Returns only the broadcast pushes, in send order.
    #[must_use]
    pub fn broadcasts(&self) -> Vec<OutboundPush> {
        self.all()
            .into_iter()
            .filter_map(|recorded| match recorded {
                RecordedPush::Broadcast(push) => Some(push),
                _ => None,
            })
            .collect()
    }

    /// Returns the pushes sent to `role`, in send order.
    #[must_use]
    pub fn sent_to_role(&self, role: Role) -> Vec<OutboundPush> {
        self.all()
            .into_iter()
            .filter_map(|recorded| match recorded {
                RecordedPush::ToRole(to, push) if to == role => Some(push),
                _ => None,
            })
            .collect()
    }

    /// Returns the pushes sent to `user_id`, in send order.
    #[must_use]
    pub fn sent_to_user(&self, user_id: &str) -> Vec<OutboundPush> {
        self.all()
            .into_iter()
            .filter_map(|recorded| match recorded {
                RecordedPush::ToUser(to, push) if to == user_id => Some(push),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RoundChannel for RecordingChannel {
    async fn broadcast(&self, push: OutboundPush) {
        self.pushes
            .lock()
            .unwrap()
            .push(RecordedPush::Broadcast(push));
    }

    async fn send_to_role(&self, role: Role, push: OutboundPush) {
        self.pushes
            .lock()
            .unwrap()
            .push(RecordedPush::ToRole(role, push));
    }

    async fn send_to_user(&self, user_id: &str, push: OutboundPush) {
        self.pushes
            .lock()
            .unwrap()
            .push(RecordedPush::ToUser(user_id.to_owned(), push));
    }
}
