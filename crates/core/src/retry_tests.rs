// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn default_matches_documented_values() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.initial_delay, Duration::from_secs(1));
    assert_eq!(config.backoff_factor, 2.0);
    assert_eq!(config.max_delay, Duration::from_secs(60));
}

#[parameterized(
    first = { 0, 1_000 },
    second = { 1, 2_000 },
    third = { 2, 4_000 },
    fifth = { 5, 32_000 },
    capped = { 6, 60_000 },
    huge = { 4_000, 60_000 },
)]
fn delay_doubles_until_cap(attempt: u32, expected_ms: u64) {
    assert_eq!(RetryConfig::default().delay_for(attempt), Duration::from_millis(expected_ms));
}

#[test]
fn flat_backoff_keeps_initial_delay() {
    let config = RetryConfig { backoff_factor: 1.0, ..RetryConfig::default() };
    assert_eq!(config.delay_for(10), Duration::from_secs(1));
}

#[test]
fn retry_budget() {
    let config = RetryConfig { max_retries: 2, ..RetryConfig::default() };
    assert!(config.allows_retry(0));
    assert!(config.allows_retry(1));
    assert!(!config.allows_retry(2));
}
