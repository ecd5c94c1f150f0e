// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use bs_core::{FailureReason, Mutation, NetworkStatus, NewSale, OperationStatus, SaleItem};

fn sale_op() -> SyncOperation {
    let sale = NewSale::new(
        "bar-1",
        "user-1",
        "cash",
        vec![SaleItem::new("beer", "Beer", 2, 1500), SaleItem::new("soda", "Soda", 1, 800)],
    );
    SyncOperation::new(Mutation::CreateSale(sale), "bar-1", "user-1", 1_700_000_000_000)
}

#[test]
fn operation_line_shows_type_domain_and_summary() {
    let op = sale_op();
    let line = format_operation_line(&op);

    assert!(line.starts_with(op.id.as_str()));
    assert!(line.contains("pending "));
    assert!(line.contains("CREATE_SALE [sales]"));
    assert!(line.contains("bar-1"));
    assert!(line.ends_with("sale of 3 unit(s) in 2 line(s), total 3800"));
}

#[test]
fn attempts_are_shown_once_retried() {
    let mut op = sale_op();
    op.retry_count = 2;

    assert!(format_operation_line(&op).ends_with("(attempts: 2)"));
}

#[test]
fn error_line_names_the_failure() {
    let mut op = sale_op();
    assert_eq!(format_operation_error(&op), None);

    op.error_message = Some("network: connection reset".to_string());
    assert_eq!(format_operation_error(&op).unwrap(), "    last error: network: connection reset");

    op.status = OperationStatus::Error;
    op.failure = Some(FailureReason::Conflict);
    op.error_message = Some("bar changed remotely".to_string());
    assert_eq!(format_operation_error(&op).unwrap(), "    error (conflict): bar changed remotely");
}

#[test]
fn timestamps_render_in_utc() {
    assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14 22:13:20 UTC");
}

#[test]
fn reports_distinguish_skipped_cycles() {
    let skipped = CycleReport {
        synced: 0,
        retried: 0,
        failed: 0,
        batches: 0,
        outcome: CycleOutcome::Skipped("network not online"),
    };
    assert_eq!(format_report(&skipped), "Sync skipped (network not online)");

    let ran = CycleReport {
        synced: 4,
        retried: 1,
        failed: 0,
        batches: 1,
        outcome: CycleOutcome::Completed,
    };
    assert_eq!(
        format_report(&ran),
        "Sync completed: 4 synced, 1 to retry, 0 failed, 1 batch call(s)"
    );
}

#[test]
fn offline_status_mentions_blocking() {
    let status = SyncStatus {
        network_status: NetworkStatus::Offline,
        pending_count: 2,
        syncing_count: 0,
        error_count: 1,
        total_count: 3,
        is_syncing: false,
        last_sync_at: None,
    };
    let decision = NetworkDecision::from_status(status.network_status);

    let lines = format_status(&status, &decision, NetworkQuality::Unknown);

    assert_eq!(lines[0], "Network: offline (quality: unknown)");
    assert!(lines[1].contains("blocked"));
    assert_eq!(lines[2], "Queue: 2 pending, 0 syncing, 1 failed (3 total)");
    assert_eq!(lines.len(), 3);
}
