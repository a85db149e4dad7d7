//! Random draws used by the outcome selector and delay samplers.
//!
//! Draws go through [`RandomSource`] so a caller can replay exact values.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Source of the two kinds of draw the pipeline needs
pub trait RandomSource: Send + Sync {
    /// Uniform integer in `[0, bound)`; `bound == 0` yields 0
    fn next_int(&self, bound: u32) -> u32;

    /// Uniform integer in `[0, bound)` over the full `u64` range; `bound == 0` yields 0
    fn next_long(&self, bound: u64) -> u64;

    /// Standard normal draw (mean 0, standard deviation 1)
    fn next_gaussian(&self) -> f64;
}

/// Thread-local generator from `rand`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_int(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        rand::random_range(0..bound)
    }

    fn next_long(&self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        rand::random_range(0..bound)
    }

    fn next_gaussian(&self) -> f64 {
        // Box-Muller; 1 - u keeps the log argument in (0, 1]
        let u1 = 1.0 - rand::random::<f64>();
        let u2 = rand::random::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// Replays queued draws in order, then falls back to zero
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    ints: Mutex<VecDeque<u32>>,
    gaussians: Mutex<VecDeque<f64>>,
}

impl ScriptedRandom {
    /// Nothing queued
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue integer draws
    #[must_use]
    pub fn with_ints(self, draws: impl IntoIterator<Item = u32>) -> Self {
        self.ints.lock().extend(draws);
        self
    }

    /// Queue gaussian draws
    #[must_use]
    pub fn with_gaussians(self, draws: impl IntoIterator<Item = f64>) -> Self {
        self.gaussians.lock().extend(draws);
        self
    }

    /// Queue one more integer draw
    pub fn push_int(&self, draw: u32) {
        self.ints.lock().push_back(draw);
    }

    /// Draws not consumed yet
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.ints.lock().len() + self.gaussians.lock().len()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_int(&self, bound: u32) -> u32 {
        let draw = self.ints.lock().pop_front().unwrap_or(0);
        draw.min(bound.saturating_sub(1))
    }

    fn next_long(&self, bound: u64) -> u64 {
        let draw = self.ints.lock().pop_front().unwrap_or(0);
        u64::from(draw).min(bound.saturating_sub(1))
    }

    fn next_gaussian(&self) -> f64 {
        self.gaussians.lock().pop_front().unwrap_or(0.0)
    }
}
