// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential reconnect backoff with symmetric jitter.

use std::time::Duration;

/// Doubling delay from `initial` up to `max`, each step scaled by a random
/// factor in `[1 - jitter, 1 + jitter]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    jitter: f64,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, jitter: f64) -> Self {
        Self {
            initial,
            max: max.max(initial),
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Un-jittered delay before reconnect attempt `attempt` (0-based).
    pub fn base(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Delay for `attempt` with `unit` in `[-1, 1]` selecting the jitter.
    pub fn delay_with(&self, attempt: u32, unit: f64) -> Duration {
        let scale = 1.0 + self.jitter * unit.clamp(-1.0, 1.0);
        self.base(attempt).mul_f64(scale)
    }

    /// Randomly jittered delay for `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, rand::random::<f64>() * 2.0 - 1.0)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), 0.2)
    }
}
