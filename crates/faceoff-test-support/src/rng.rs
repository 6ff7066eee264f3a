//! Test random sources — deterministic `RandomSource` implementations.

use faceoff_core::rng::RandomSource;

/// A no-op source that always returns `min` for `next_u32_range` and `0.0`
/// for `next_f64`. Suitable for tests that do not depend on specific
/// random values.
#[derive(Debug, Clone, Copy)]
pub struct MockRandom;

impl RandomSource for MockRandom {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }

    fn next_f64(&mut self) -> f64 {
        0.0
    }
}

/// A source that returns values from predetermined sequences. Panics when
/// a sequence is exhausted. Used in tests that need specific, repeatable
/// outcomes (booster draws, challenge-type selection, intro delays).
#[derive(Debug)]
pub struct SequenceRandom {
    floats: Vec<f64>,
    float_index: usize,
    ints: Vec<u32>,
    int_index: usize,
}

impl SequenceRandom {
    /// Creates a source yielding `floats` from `next_f64` and `ints` from
    /// `next_u32_range`, in order.
    #[must_use]
    pub fn new(floats: Vec<f64>, ints: Vec<u32>) -> Self {
        Self {
            floats,
            float_index: 0,
            ints,
            int_index: 0,
        }
    }

    /// Creates a source with only a float sequence.
    #[must_use]
    pub fn with_floats(floats: Vec<f64>) -> Self {
        Self::new(floats, Vec::new())
    }
}

impl RandomSource for SequenceRandom {
    fn next_u32_range(&mut self, _min: u32, _max: u32) -> u32 {
        let value = self.ints[self.int_index];
        self.int_index += 1;
        value
    }

    fn next_f64(&mut self) -> f64 {
        let value = self.floats[self.float_index];
        self.float_index += 1;
        value
    }
}
