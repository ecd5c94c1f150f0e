// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end behavior of monitor, queue and orchestrator wired together.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bs_core::{
    FailureReason, IdempotencyKey, Mutation, NetworkStatus, OperationId, OperationStatus,
    RetryConfig,
};
use yare::parameterized;

use crate::monitor::{MonitorConfig, NetworkMonitor};
use crate::queue::QueueEvent;
use crate::remote::RemoteError;
use crate::test_helpers::{
    bar_update, payment, sale, salary, ticket, Harness, MockProbe, ProbeOutcome, RemoteCall,
};

fn paused<F: Future>(test: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("test runtime")
        .block_on(test)
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Records transitions after the initial delivery.
fn transitions(monitor: &NetworkMonitor) -> (Arc<Mutex<Vec<NetworkStatus>>>, crate::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let first = Arc::new(Mutex::new(true));
    let sub = monitor.subscribe(move |s| {
        let mut first = first.lock().unwrap();
        if std::mem::replace(&mut *first, false) {
            return;
        }
        sink.lock().unwrap().push(*s);
    });
    (seen, sub)
}

fn key_of(mutation: &Mutation) -> IdempotencyKey {
    mutation.idempotency_key().cloned().unwrap()
}

#[tokio::test(start_paused = true)]
async fn offline_sales_go_out_in_one_batch_once_online() {
    let h = Harness::new();
    h.orchestrator.init();
    h.monitor.handle_offline();
    advance(12_500).await;
    assert_eq!(h.monitor.status(), NetworkStatus::Offline);

    let sales: Vec<Mutation> = (0..3).map(|_| sale("bar-1")).collect();
    let keys: Vec<IdempotencyKey> = sales.iter().map(key_of).collect();
    for m in sales {
        h.enqueue(m);
    }
    advance(1_000).await;
    assert!(h.remote.calls().is_empty());

    h.monitor.handle_online();
    advance(100).await;

    assert_eq!(
        h.remote.writes(),
        vec![RemoteCall::SalesBatch { bar_id: "bar-1".to_string(), keys }]
    );
    assert!(h.queue.is_empty());
    h.orchestrator.cleanup();
}

#[tokio::test(start_paused = true)]
async fn bar_update_older_than_remote_ends_in_conflict() {
    let h = Harness::new();
    h.monitor.handle_online();
    h.clock.set(100);
    let id = h.enqueue(bar_update("bar-1"));
    h.remote.set_bar_modified("bar-1", 200);

    h.orchestrator.sync_all().await;

    let op = h.queue.get(&id).unwrap();
    assert_eq!(op.timestamp, 100);
    assert_eq!(op.status, OperationStatus::Error);
    assert_eq!(op.failure, Some(FailureReason::Conflict));
    assert!(!h.remote.writes().iter().any(|c| matches!(c, RemoteCall::UpdateBar(_))));
}

#[tokio::test(start_paused = true)]
async fn short_outage_reports_unstable_then_online() {
    let h = Harness::new();
    h.monitor.handle_online();
    let (seen, _sub) = transitions(&h.monitor);

    h.monitor.handle_offline();
    advance(11_000).await;
    h.monitor.handle_online();
    advance(30_000).await;

    assert_eq!(*seen.lock().unwrap(), vec![NetworkStatus::Unstable, NetworkStatus::Online]);
}

#[tokio::test(start_paused = true)]
async fn failing_probes_report_offline_once_at_grace_expiry() {
    let probe = MockProbe::new(ProbeOutcome::Unreachable);
    let monitor = NetworkMonitor::new(MonitorConfig::default(), probe.clone());
    monitor.handle_online();
    let (seen, _sub) = transitions(&monitor);

    monitor.init();
    advance(11_900).await;
    assert_eq!(monitor.status(), NetworkStatus::Unstable);
    assert!(probe.calls() >= 3);

    advance(200).await;
    assert_eq!(monitor.status(), NetworkStatus::Offline);

    advance(30_000).await;
    assert_eq!(*seen.lock().unwrap(), vec![NetworkStatus::Unstable, NetworkStatus::Offline]);
    monitor.cleanup();
}

#[parameterized(
    single_event = { &[0] },
    bursts = { &[0, 5_000, 11_000] },
    late_start = { &[3_000, 3_500, 9_000, 14_000] },
)]
fn recovery_before_grace_never_flickers_offline(negatives: &[u64]) {
    paused(async {
        let probe = MockProbe::new(ProbeOutcome::Reachable);
        let monitor = NetworkMonitor::new(MonitorConfig::default(), probe);
        monitor.handle_online();
        let (seen, _sub) = transitions(&monitor);

        let mut clock = 0;
        for &at in negatives {
            advance(at - clock).await;
            clock = at;
            monitor.handle_offline();
        }
        // positive signal inside the grace armed by the first negative
        advance(negatives[0] + 11_900 - clock).await;
        monitor.handle_online();
        advance(60_000).await;

        let seen = seen.lock().unwrap();
        assert!(!seen.contains(&NetworkStatus::Offline), "{:?}", seen);
        assert_eq!(seen.last(), Some(&NetworkStatus::Online));
    });
}

#[parameterized(
    short_grace = { 5_000 },
    default_grace = { 12_000 },
)]
fn sustained_outage_goes_offline_exactly_once(grace_ms: u64) {
    paused(async {
        let config = MonitorConfig {
            grace_period: Duration::from_millis(grace_ms),
            ..MonitorConfig::default()
        };
        let monitor = NetworkMonitor::new(config, MockProbe::new(ProbeOutcome::Reachable));
        monitor.handle_online();
        let (seen, _sub) = transitions(&monitor);

        for _ in 0..30 {
            monitor.handle_offline();
            advance(1_000).await;
        }

        let offline = seen.lock().unwrap().iter().filter(|s| **s == NetworkStatus::Offline).count();
        assert_eq!(offline, 1);
        assert_eq!(monitor.status(), NetworkStatus::Offline);
    });
}

#[tokio::test(start_paused = true)]
async fn syncing_transitions_follow_enqueue_order() {
    let h = Harness::new();
    h.monitor.handle_online();
    let t = ticket("bar-1");
    let temp = match &t {
        Mutation::CreateTicket(t) => t.temp_id.clone(),
        _ => unreachable!(),
    };
    let mutations = vec![
        sale("bar-1"),
        t,
        sale("bar-1"),
        sale("bar-1"),
        payment("bar-1", &temp),
        salary("bar-1"),
        bar_update("bar-1"),
        sale("bar-1"),
    ];
    let enqueued: Vec<OperationId> = mutations.into_iter().map(|m| h.enqueue(m)).collect();
    let syncing = Arc::new(Mutex::new(Vec::new()));
    let sink = syncing.clone();
    let _sub = h.queue.subscribe(move |e| {
        if let QueueEvent::Updated(op) = e {
            if op.status == OperationStatus::Syncing {
                sink.lock().unwrap().push(op.id.clone());
            }
        }
    });

    let report = h.orchestrator.sync_all().await;

    assert_eq!(report.synced, enqueued.len());
    assert_eq!(*syncing.lock().unwrap(), enqueued);
}

#[tokio::test(start_paused = true)]
async fn replayed_calls_apply_each_key_once() {
    let h = Harness::new();
    h.monitor.handle_online();
    for _ in 0..3 {
        h.enqueue(sale("bar-1"));
    }
    h.enqueue(ticket("bar-1"));
    h.remote.lose_next_response();

    let first = h.orchestrator.sync_all().await;
    assert_eq!((first.retried, first.synced), (3, 1));
    let second = h.orchestrator.sync_all().await;
    assert_eq!(second.synced, 3);

    assert!(h.queue.is_empty());
    assert_eq!(h.remote.effects(), 4);
}

#[parameterized(
    one_attempt = { 1 },
    three_attempts = { 3 },
    default_budget = { 5 },
)]
fn always_failing_operation_stops_at_the_retry_budget(max_retries: u32) {
    paused(async move {
        let h = Harness::with_retry(RetryConfig { max_retries, ..RetryConfig::default() });
        h.monitor.handle_online();
        let id = h.enqueue(ticket("bar-1"));
        h.remote.fail_always(Some(RemoteError::timeout("no answer")));

        for _ in 0..max_retries + 3 {
            h.orchestrator.sync_all().await;
        }

        let op = h.queue.get(&id).unwrap();
        assert_eq!(op.status, OperationStatus::Error);
        assert_eq!(op.retry_count, max_retries);
        assert_eq!(op.failure, Some(FailureReason::RetriesExhausted));
        assert_eq!(h.remote.writes().len(), max_retries as usize);
    });
}

#[tokio::test(start_paused = true)]
async fn decision_is_stable_between_transitions() {
    let probe = MockProbe::new(ProbeOutcome::Reachable);
    let monitor = NetworkMonitor::new(MonitorConfig::default(), probe);
    let mut observed = Vec::new();

    observed.push((monitor.decision(), monitor.decision()));
    monitor.handle_online();
    observed.push((monitor.decision(), monitor.decision()));
    monitor.handle_offline();
    observed.push((monitor.decision(), monitor.decision()));
    advance(12_100).await;
    observed.push((monitor.decision(), monitor.decision()));

    for (a, b) in &observed {
        assert_eq!(a, b);
    }
    assert!(observed[3].0.should_block);
}
