//! Users, contributions, announcements, and the activity feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display identity of a connected user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform user identifier.
    pub id: String,
    /// Display name.
    pub username: String,
}

impl User {
    /// Builds a user.
    #[must_use]
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }

    /// Placeholder identity for a contributor the roster does not know.
    #[must_use]
    pub fn unknown(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            username: id.clone(),
            id,
        }
    }
}

/// One user's accumulated contribution to a side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContribution {
    /// The contributing user.
    pub user: User,
    /// Accumulated effective score contributed.
    pub score: i64,
}

/// A transient display directive shown over one side of the screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    /// Main text.
    pub text: String,
    /// How long the client should display it, in milliseconds.
    pub duration_ms: u64,
    /// Optional trailing text (a countdown, a point total).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_text: Option<String>,
    /// Optional background color override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl Announcement {
    /// Builds a plain announcement.
    #[must_use]
    pub fn new(text: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            text: text.into(),
            duration_ms,
            trailing_text: None,
            background_color: None,
        }
    }

    /// Attaches trailing text.
    #[must_use]
    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing_text = Some(trailing.into());
        self
    }

    /// Attaches a background color.
    #[must_use]
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }
}

const FEED_TEXT_COLOR: &str = "#ffffff";
const FEED_USERNAME_COLOR: &str = "#cacaca";
const FEED_ICON_BACKGROUND_COLOR: &str = "#BEBEBE";
const FEED_ICON_COLOR: &str = "#ffffff";

/// One entry of the append-only activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Stable identifier for display lists.
    pub id: Uuid,
    /// Attributed username; `None` for unattributed entries.
    pub username: Option<String>,
    /// Human-readable body.
    pub body: String,
    /// Append timestamp.
    pub created_at: DateTime<Utc>,
    /// Body text color.
    pub text_color: String,
    /// Username text color.
    pub username_color: String,
    /// Icon image URL; empty for the default icon.
    pub icon_image_url: String,
    /// Icon background color.
    pub icon_background_color: String,
    /// Icon foreground color.
    pub icon_color: String,
}

impl FeedItem {
    /// Builds an entry attributed to `username` with the default palette.
    #[must_use]
    pub fn user(
        username: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::system(body, created_at)
        }
    }

    /// Builds an unattributed system entry with the default palette.
    #[must_use]
    pub fn system(body: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: None,
            body: body.into(),
            created_at,
            text_color: FEED_TEXT_COLOR.to_owned(),
            username_color: FEED_USERNAME_COLOR.to_owned(),
            icon_image_url: String::new(),
            icon_background_color: FEED_ICON_BACKGROUND_COLOR.to_owned(),
            icon_color: FEED_ICON_COLOR.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{FeedItem, User};

    #[test]
    fn test_unknown_user_falls_back_to_id_as_username() {
        // Act
        let user = User::unknown("u-42");

        // Assert
        assert_eq!(user.id, "u-42");
        assert_eq!(user.username, "u-42");
    }

    #[test]
    fn test_feed_item_user_carries_attribution_and_defaults() {
        // Arrange
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        // Act
        let item = FeedItem::user("ada", "sent a rose", at);

        // Assert
        assert_eq!(item.username.as_deref(), Some("ada"));
        assert_eq!(item.body, "sent a rose");
        assert_eq!(item.created_at, at);
        assert_eq!(item.text_color, "#ffffff");
    }
}
