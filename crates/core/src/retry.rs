// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded exponential backoff.

use std::time::Duration;

/// Retry budget and backoff curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Failed attempts allowed before an operation becomes terminal.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Delay before attempt `attempt` (0-indexed):
    /// `min(initial_delay * backoff_factor^attempt, max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled.max(0.0))
    }

    /// Whether an operation that has failed `retry_count` times may run again.
    pub fn allows_retry(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
