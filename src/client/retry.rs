// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Delay between background drain attempts.

use std::time::Duration;

/// Fixed interval with optional capped exponential backoff after failed cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
    pub backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            multiplier: 2,
            max_delay: Duration::from_secs(5 * 60),
            backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Always wait `interval`, regardless of failures.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            backoff: false,
            ..Self::default()
        }
    }

    /// Delay before the next attempt after `consecutive_failures` failed cycles.
    pub fn delay_after(&self, consecutive_failures: u32) -> Duration {
        if !self.backoff || consecutive_failures == 0 {
            return self.interval;
        }

        let factor = self
            .multiplier
            .max(1)
            .checked_pow(consecutive_failures)
            .unwrap_or(u32::MAX);
        self.interval
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
            .max(self.interval)
    }
}
