//! Moderation filter interface.
//!
//! User-authored text flows through the hosting platform's moderation
//! pipeline. The round engine itself only emits system-generated text, so
//! this interface exists for the other game modes that share the platform.

use async_trait::async_trait;

/// Text-moderation decision point.
#[async_trait]
pub trait ModerationFilter: Send + Sync {
    /// Returns whether `text` authored by `user_id` may be shown.
    async fn should_allow(&self, text: &str, user_id: &str) -> bool;
}

/// Filter that allows everything. The default when no pipeline is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl ModerationFilter for AllowAll {
    async fn should_allow(&self, _text: &str, _user_id: &str) -> bool {
        true
    }
}
