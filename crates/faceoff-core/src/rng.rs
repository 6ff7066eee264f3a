//! Random source abstraction for determinism.
//!
//! Booster draws and challenge-type selection are probabilistic control
//! flow; injecting the source keeps those paths replayable in tests.

use rand::Rng;

/// Abstraction over random number generation.
pub trait RandomSource: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;

    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;
}

/// Production source backed by the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        rand::rng().random_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        rand::rng().random_range(0.0..1.0)
    }
}
