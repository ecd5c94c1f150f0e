// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Text formatting for operations, status and cycle reports.

use bs_core::{NetworkDecision, NetworkQuality, SyncOperation};
use bs_sync::{CycleOutcome, CycleReport, SyncStatus};
use chrono::{DateTime, Utc};

/// Format an operation as a single listing line:
/// `<id>  <status>  <TYPE> [<domain>]  <bar>  <summary>`.
pub fn format_operation_line(op: &SyncOperation) -> String {
    let kind = op.mutation_type();
    let mut line = format!(
        "{}  {:<7}  {} [{}]  {}  {}",
        op.id,
        op.status.as_str(),
        kind,
        kind.domain(),
        op.bar_id,
        op.mutation.summary()
    );
    if op.retry_count > 0 {
        line.push_str(&format!("  (attempts: {})", op.retry_count));
    }
    line
}

/// Indented error line shown under failed or retried operations.
pub fn format_operation_error(op: &SyncOperation) -> Option<String> {
    let message = op.error_message.as_deref()?;
    Some(match op.failure {
        Some(reason) => format!("    error ({}): {}", reason, message),
        None => format!("    last error: {}", message),
    })
}

/// Milliseconds since epoch as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn format_timestamp(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub fn format_outcome(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Completed => "completed".to_string(),
        CycleOutcome::Skipped(reason) => format!("skipped ({})", reason),
        CycleOutcome::Aborted(reason) => format!("aborted ({})", reason),
        CycleOutcome::Interrupted => "interrupted".to_string(),
    }
}

pub fn format_report(report: &CycleReport) -> String {
    if !report.ran() {
        return format!("Sync {}", format_outcome(&report.outcome));
    }
    format!(
        "Sync {}: {} synced, {} to retry, {} failed, {} batch call(s)",
        format_outcome(&report.outcome),
        report.synced,
        report.retried,
        report.failed,
        report.batches
    )
}

/// Multi-line status block for `barsync status`.
pub fn format_status(
    status: &SyncStatus,
    decision: &NetworkDecision,
    quality: NetworkQuality,
) -> Vec<String> {
    let mut lines = vec![format!("Network: {} (quality: {})", status.network_status, quality)];
    if decision.should_block {
        lines.push("  network work is blocked until connectivity returns".to_string());
    }
    lines.push(format!(
        "Queue: {} pending, {} syncing, {} failed ({} total)",
        status.pending_count, status.syncing_count, status.error_count, status.total_count
    ));
    if let Some(at) = status.last_sync_at {
        lines.push(format!("Last sync: {}", format_timestamp(at)));
    }
    lines
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
