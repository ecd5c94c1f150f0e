// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity status, the blocking decision derived from it, and the
//! throttling strategy derived from observed link quality.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Debounced connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    /// Last reachability probe succeeded.
    Online,
    /// Grace period elapsed without recovery.
    Offline,
    /// Negative signal seen, grace period still running.
    Unstable,
    /// Initial state until the first signal resolves.
    Checking,
}

impl NetworkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkStatus::Online => "online",
            NetworkStatus::Offline => "offline",
            NetworkStatus::Unstable => "unstable",
            NetworkStatus::Checking => "checking",
        }
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "online" => Ok(NetworkStatus::Online),
            "offline" => Ok(NetworkStatus::Offline),
            "unstable" => Ok(NetworkStatus::Unstable),
            "checking" => Ok(NetworkStatus::Checking),
            _ => Err(Error::InvalidNetworkStatus(s.to_string())),
        }
    }
}

/// Whether network work should proceed, computed from a single status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkDecision {
    pub should_block: bool,
    pub should_show_banner: bool,
    pub reason: NetworkStatus,
}

impl NetworkDecision {
    /// Only `offline` blocks and shows the banner; `unstable` does neither.
    pub fn from_status(status: NetworkStatus) -> Self {
        let offline = status == NetworkStatus::Offline;
        NetworkDecision { should_block: offline, should_show_banner: offline, reason: status }
    }
}

/// Link quality bucket derived from probe round-trip time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkQuality {
    Excellent,
    Good,
    Poor,
    VeryPoor,
    Unknown,
}

impl NetworkQuality {
    /// Buckets a round-trip time.
    pub fn from_rtt(rtt: Duration) -> Self {
        match rtt.as_millis() {
            0..=300 => NetworkQuality::Excellent,
            301..=700 => NetworkQuality::Good,
            701..=1500 => NetworkQuality::Poor,
            _ => NetworkQuality::VeryPoor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkQuality::Excellent => "excellent",
            NetworkQuality::Good => "good",
            NetworkQuality::Poor => "poor",
            NetworkQuality::VeryPoor => "very_poor",
            NetworkQuality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NetworkQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch size and inter-operation delay for one drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStrategy {
    /// Upper bound on operations collapsed into one batched call.
    pub max_batch_size: usize,
    /// Pause between sequential non-batched operations.
    pub op_delay: Duration,
}

impl SyncStrategy {
    pub fn for_quality(quality: NetworkQuality) -> Self {
        let (max_batch_size, delay_ms) = match quality {
            NetworkQuality::Excellent => (20, 200),
            NetworkQuality::Good => (5, 1_000),
            NetworkQuality::Poor => (2, 3_000),
            NetworkQuality::VeryPoor => (1, 5_000),
            NetworkQuality::Unknown => (10, 500),
        };
        SyncStrategy { max_batch_size, op_delay: Duration::from_millis(delay_ms) }
    }
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
