// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery retry schedule.

use std::time::Duration;

use rand::Rng;

/// Retries after a failed attempt wait `base * 2^n` plus up to `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    /// Delay before retry `retry` (0-based) with a fixed jitter.
    pub fn delay_with(&self, retry: u32, jitter: Duration) -> Duration {
        let factor = 1u32.checked_shl(retry.min(16)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).saturating_add(jitter.min(self.jitter))
    }

    pub fn delay(&self, retry: u32) -> Duration {
        let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = if max_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=max_ms)
        };
        self.delay_with(retry, Duration::from_millis(jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base: Duration::from_secs(5),
            jitter: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_five_seconds() {
        let policy = RetryPolicy::default();
        let secs: Vec<u64> = (0..3)
            .map(|n| policy.delay_with(n, Duration::ZERO).as_secs())
            .collect();
        assert_eq!(secs, vec![5, 10, 20]);
    }

    #[test]
    fn jitter_is_bounded() {
        let policy = RetryPolicy::default();
        for n in 0..3 {
            let d = policy.delay(n);
            let base = policy.delay_with(n, Duration::ZERO);
            assert!(d >= base && d <= base + policy.jitter);
        }
        assert_eq!(
            policy.delay_with(0, Duration::from_secs(30)),
            Duration::from_secs(6)
        );
    }
}
