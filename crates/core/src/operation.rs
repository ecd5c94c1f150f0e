// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Queued units of durable work and their lifecycle metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mutation::{Mutation, MutationType};

/// Identifier assigned to an operation at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Generates a fresh `op-<uuid>` identifier.
    pub fn generate() -> Self {
        OperationId(format!("op-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        OperationId(s.to_string())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a queued operation.
///
/// `pending -> syncing -> (success | error)`. Success removes the operation
/// from the queue; an error with retries left goes back to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Syncing,
    Success,
    Error,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Pending => "pending",
            OperationStatus::Syncing => "syncing",
            OperationStatus::Success => "success",
            OperationStatus::Error => "error",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(OperationStatus::Pending),
            "syncing" => Ok(OperationStatus::Syncing),
            "success" => Ok(OperationStatus::Success),
            "error" => Ok(OperationStatus::Error),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Why an operation stopped being retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Remote rejected the payload (validation or constraint).
    Validation,
    /// Remote resource changed after the operation was created.
    Conflict,
    /// Retryable failures used up the retry budget.
    RetriesExhausted,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Validation => "validation",
            FailureReason::Conflict => "conflict",
            FailureReason::RetriesExhausted => "retries_exhausted",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mutation waiting in the queue, with its scoping and retry metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    pub id: OperationId,
    #[serde(flatten)]
    pub mutation: Mutation,
    /// Creation time in milliseconds since Unix epoch.
    pub timestamp: u64,
    pub bar_id: String,
    pub user_id: String,
    pub status: OperationStatus,
    pub retry_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_attempt_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

impl SyncOperation {
    /// Creates a fresh pending operation.
    pub fn new(mutation: Mutation, bar_id: &str, user_id: &str, timestamp: u64) -> Self {
        SyncOperation {
            id: OperationId::generate(),
            mutation,
            timestamp,
            bar_id: bar_id.to_string(),
            user_id: user_id.to_string(),
            status: OperationStatus::Pending,
            retry_count: 0,
            last_attempt_at: None,
            error_message: None,
            failure: None,
        }
    }

    pub fn mutation_type(&self) -> MutationType {
        self.mutation.mutation_type()
    }

    /// True once the operation is excluded from automatic retry.
    pub fn is_terminal(&self) -> bool {
        self.status == OperationStatus::Error
    }
}

/// Selects a subset of queued operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationFilter {
    pub status: Option<OperationStatus>,
    pub bar_id: Option<String>,
}

impl OperationFilter {
    /// Matches every operation.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: OperationStatus) -> Self {
        OperationFilter { status: Some(status), bar_id: None }
    }

    /// Narrows the filter to one bar.
    pub fn for_bar(mut self, bar_id: &str) -> Self {
        self.bar_id = Some(bar_id.to_string());
        self
    }

    pub fn matches(&self, op: &SyncOperation) -> bool {
        self.status.is_none_or(|s| op.status == s)
            && self.bar_id.as_deref().is_none_or(|b| op.bar_id == b)
    }
}

/// Counts of queued operations by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending_count: usize,
    pub syncing_count: usize,
    pub error_count: usize,
    pub total_count: usize,
}

impl QueueStats {
    pub fn from_operations<'a>(ops: impl IntoIterator<Item = &'a SyncOperation>) -> Self {
        let mut stats = QueueStats::default();
        for op in ops {
            stats.total_count += 1;
            match op.status {
                OperationStatus::Pending => stats.pending_count += 1,
                OperationStatus::Syncing => stats.syncing_count += 1,
                OperationStatus::Error => stats.error_count += 1,
                OperationStatus::Success => {}
            }
        }
        stats
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
