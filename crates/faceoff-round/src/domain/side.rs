//! Sides, side selections, and session roles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two competing parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The streamer's side.
    Host,
    /// The invited opponent's side.
    Guest,
}

impl Side {
    /// Returns the opposing side.
    #[must_use]
    pub fn opponent(self) -> Side {
        match self {
            Side::Host => Side::Guest,
            Side::Guest => Side::Host,
        }
    }

    /// Returns the lowercase wire name of the side.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Host => "host",
            Side::Guest => "guest",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addresses an action at one side or at both identically.
///
/// Contributions deliberately carry a bare [`Side`]: a contribution to
/// "both" is a programmer error, and this split makes it unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideSelection {
    /// A single side.
    One(Side),
    /// Both sides, identically.
    Both,
}

impl SideSelection {
    /// Returns whether `side` is covered by this selection.
    #[must_use]
    pub fn contains(self, side: Side) -> bool {
        match self {
            SideSelection::One(selected) => selected == side,
            SideSelection::Both => true,
        }
    }

    /// Iterates the concrete sides covered by this selection.
    pub fn sides(self) -> impl Iterator<Item = Side> {
        let pair = match self {
            SideSelection::One(side) => [Some(side), None],
            SideSelection::Both => [Some(Side::Host), Some(Side::Guest)],
        };
        pair.into_iter().flatten()
    }

    /// Returns the wire prefix used in timer keys (`host`/`guest`/`both`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SideSelection::One(side) => side.as_str(),
            SideSelection::Both => "both",
        }
    }
}

impl From<Side> for SideSelection {
    fn from(side: Side) -> Self {
        SideSelection::One(side)
    }
}

/// Role of a connected session, assigned by the hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The streamer; principal of the host side.
    Streamer,
    /// The invited opponent; principal of the guest side.
    Guest,
    /// Any other spectator.
    Viewer,
}

impl Role {
    /// Returns the side this role is the principal of, if any.
    #[must_use]
    pub fn principal_side(self) -> Option<Side> {
        match self {
            Role::Streamer => Some(Side::Host),
            Role::Guest => Some(Side::Guest),
            Role::Viewer => None,
        }
    }
}

/// A pair of values, one per side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerSide<T> {
    /// The host side's value.
    pub host: T,
    /// The guest side's value.
    pub guest: T,
}

impl<T> PerSide<T> {
    /// Returns the value for `side`.
    pub fn get(&self, side: Side) -> &T {
        match side {
            Side::Host => &self.host,
            Side::Guest => &self.guest,
        }
    }

    /// Returns the value for `side` mutably.
    pub fn get_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Host => &mut self.host,
            Side::Guest => &mut self.guest,
        }
    }

    /// Maps both values through `f`.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> PerSide<U> {
        PerSide {
            host: f(self.host),
            guest: f(self.guest),
        }
    }
}

impl<T: Clone> PerSide<T> {
    /// Builds a pair holding `value` on both sides.
    pub fn both(value: T) -> Self {
        PerSide {
            host: value.clone(),
            guest: value,
        }
    }
}
