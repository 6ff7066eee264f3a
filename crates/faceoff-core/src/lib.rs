//! Faceoff Core — shared abstractions.
//!
//! This crate defines the traits every component of the round engine
//! depends on: time, randomness, the durable key-value store behind an
//! active round, the cross-round win-streak store, and the moderation
//! filter exposed by the hosting platform. It contains no game logic.

pub mod clock;
pub mod error;
pub mod moderation;
pub mod rng;
pub mod store;
pub mod streaks;
