// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles shared by the sync tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bs_core::{
    BarUpdates, IdempotencyKey, ManualClock, Mutation, NewReturn, NewSalary, NewSale,
    NewServerMapping, NewTicket, RetryConfig, SaleItem, TicketPayment,
};

use crate::credentials::{CredentialError, CredentialProvider, Session};
use crate::monitor::{MonitorConfig, NetworkMonitor, Probe, ProbeError};
use crate::orchestrator::{OrchestratorConfig, SyncOrchestrator};
use crate::queue::OperationQueue;
use crate::remote::{Ack, ItemVerdict, RemoteAuthority, RemoteError};
use crate::runtime::BoxFuture;
use crate::store::MemoryStore;
use crate::translations::IdTranslations;

pub fn sale(bar_id: &str) -> Mutation {
    Mutation::CreateSale(NewSale::new(
        bar_id,
        "user-1",
        "cash",
        vec![SaleItem::new("beer", "Beer", 2, 1500), SaleItem::new("soda", "Soda", 1, 800)],
    ))
}

pub fn sale_on_ticket(bar_id: &str, ticket_id: &str) -> Mutation {
    let items = vec![SaleItem::new("beer", "Beer", 1, 1500)];
    let mut sale = NewSale::new(bar_id, "user-1", "cash", items);
    sale.ticket_id = Some(ticket_id.to_string());
    Mutation::CreateSale(sale)
}

pub fn bar_update(bar_id: &str) -> Mutation {
    let mut updates = BarUpdates::new(bar_id);
    updates.name = Some("Le Zinc".to_string());
    Mutation::UpdateBar(updates)
}

pub fn ticket(bar_id: &str) -> Mutation {
    Mutation::CreateTicket(NewTicket::new(bar_id, "user-1", 4))
}

pub fn payment(bar_id: &str, ticket_id: &str) -> Mutation {
    Mutation::PayTicket(TicketPayment::new(bar_id, ticket_id, "user-1", "mobile"))
}

pub fn salary(bar_id: &str) -> Mutation {
    Mutation::AddSalary(NewSalary {
        bar_id: bar_id.to_string(),
        member_id: "member-1".to_string(),
        amount: 120_000,
        period: "2026-10".to_string(),
        paid_by: "user-1".to_string(),
        idempotency_key: IdempotencyKey::generate(),
    })
}

/// Scripted probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    /// Never answers; the monitor's timeout decides.
    Hang,
}

/// Probe returning scripted outcomes, then a default.
pub struct MockProbe {
    script: Mutex<VecDeque<ProbeOutcome>>,
    fallback: Mutex<ProbeOutcome>,
    latency: Mutex<Duration>,
    calls: AtomicUsize,
}

impl MockProbe {
    pub fn new(fallback: ProbeOutcome) -> Arc<Self> {
        Arc::new(MockProbe {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            latency: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, outcome: ProbeOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub fn set_fallback(&self, outcome: ProbeOutcome) {
        *self.fallback.lock().unwrap() = outcome;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Probe for MockProbe {
    fn probe(&self) -> BoxFuture<'_, Result<(), ProbeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fallback = *self.fallback.lock().unwrap();
        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(fallback);
        let latency = *self.latency.lock().unwrap();
        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            match outcome {
                ProbeOutcome::Reachable => Ok(()),
                ProbeOutcome::Unreachable => Err(ProbeError::Status(503)),
                ProbeOutcome::Hang => std::future::pending().await,
            }
        })
    }
}

/// A call received by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CreateSale(IdempotencyKey),
    SalesBatch { bar_id: String, keys: Vec<IdempotencyKey> },
    CreateReturn(IdempotencyKey),
    CreateTicket(IdempotencyKey),
    PayTicket { ticket_id: String },
    BarLastModified(String),
    UpdateBar(String),
    AddSalary(IdempotencyKey),
    CreateServerMapping(String),
}

/// In-memory remote that applies each idempotency key at most once.
#[derive(Default)]
pub struct MockRemote {
    calls: Mutex<Vec<RemoteCall>>,
    applied: Mutex<HashSet<IdempotencyKey>>,
    effects: AtomicUsize,
    failures: Mutex<VecDeque<RemoteError>>,
    fail_always: Mutex<Option<RemoteError>>,
    lose_responses: AtomicUsize,
    item_errors: Mutex<HashMap<IdempotencyKey, RemoteError>>,
    omitted: Mutex<HashSet<IdempotencyKey>>,
    bar_modified: Mutex<HashMap<String, u64>>,
    latency: Mutex<Duration>,
    sessions: Mutex<Vec<String>>,
    next_ticket: AtomicU64,
}

impl MockRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(MockRemote::default())
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Mutating calls only, excluding conflict reads.
    pub fn writes(&self) -> Vec<RemoteCall> {
        self.calls().into_iter().filter(|c| !matches!(c, RemoteCall::BarLastModified(_))).collect()
    }

    /// Number of distinct mutations applied.
    pub fn effects(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    pub fn has_applied(&self, key: &IdempotencyKey) -> bool {
        self.applied.lock().unwrap().contains(key)
    }

    /// Fails the next write call with `error`.
    pub fn fail_next(&self, error: RemoteError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn fail_always(&self, error: Option<RemoteError>) {
        *self.fail_always.lock().unwrap() = error;
    }

    /// Applies the next write, then reports a network failure.
    pub fn lose_next_response(&self) {
        self.lose_responses.fetch_add(1, Ordering::SeqCst);
    }

    /// Rejects one item of a batch.
    pub fn reject_item(&self, key: &IdempotencyKey, error: RemoteError) {
        self.item_errors.lock().unwrap().insert(key.clone(), error);
    }

    /// Leaves one item out of batch responses.
    pub fn omit_item(&self, key: &IdempotencyKey) {
        self.omitted.lock().unwrap().insert(key.clone());
    }

    pub fn set_bar_modified(&self, bar_id: &str, at_ms: u64) {
        self.bar_modified.lock().unwrap().insert(bar_id.to_string(), at_ms);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Access tokens passed to `authorize`.
    pub fn sessions(&self) -> Vec<String> {
        self.sessions.lock().unwrap().clone()
    }

    fn record(&self, call: RemoteCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn scripted_failure(&self) -> Option<RemoteError> {
        if let Some(error) = self.fail_always.lock().unwrap().clone() {
            return Some(error);
        }
        self.failures.lock().unwrap().pop_front()
    }

    fn apply(&self, key: Option<&IdempotencyKey>, remote_id: Option<String>) -> Ack {
        if let Some(key) = key {
            if !self.applied.lock().unwrap().insert(key.clone()) {
                return Ack { remote_id, duplicate: true };
            }
        }
        self.effects.fetch_add(1, Ordering::SeqCst);
        Ack { remote_id, duplicate: false }
    }

    fn take_lost_response(&self) -> bool {
        self.lose_responses
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    async fn write(
        &self,
        call: RemoteCall,
        key: Option<&IdempotencyKey>,
        remote_id: Option<String>,
    ) -> Result<Ack, RemoteError> {
        self.delay().await;
        self.record(call);
        if let Some(error) = self.scripted_failure() {
            return Err(error);
        }
        let ack = self.apply(key, remote_id);
        if self.take_lost_response() {
            return Err(RemoteError::network("connection reset"));
        }
        Ok(ack)
    }
}

impl RemoteAuthority for MockRemote {
    fn authorize(&self, session: &Session) {
        self.sessions.lock().unwrap().push(session.access_token.clone());
    }

    fn create_sale<'a>(&'a self, sale: &'a NewSale) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        let key = &sale.idempotency_key;
        Box::pin(self.write(RemoteCall::CreateSale(key.clone()), Some(key), None))
    }

    fn create_sales_batch<'a>(
        &'a self,
        bar_id: &'a str,
        sales: &'a [NewSale],
    ) -> BoxFuture<'a, Result<Vec<ItemVerdict>, RemoteError>> {
        Box::pin(async move {
            self.delay().await;
            let keys = sales.iter().map(|s| s.idempotency_key.clone()).collect();
            self.record(RemoteCall::SalesBatch { bar_id: bar_id.to_string(), keys });
            if let Some(error) = self.scripted_failure() {
                return Err(error);
            }
            let mut verdicts = Vec::new();
            for sale in sales {
                let key = &sale.idempotency_key;
                if self.omitted.lock().unwrap().contains(key) {
                    continue;
                }
                let rejected = self.item_errors.lock().unwrap().get(key).cloned();
                let result = match rejected {
                    Some(error) => Err(error),
                    None => Ok(self.apply(Some(key), None)),
                };
                verdicts.push(ItemVerdict { idempotency_key: key.clone(), result });
            }
            if self.take_lost_response() {
                return Err(RemoteError::network("connection reset"));
            }
            Ok(verdicts)
        })
    }

    fn create_return<'a>(&'a self, ret: &'a NewReturn) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        let key = &ret.idempotency_key;
        Box::pin(self.write(RemoteCall::CreateReturn(key.clone()), Some(key), None))
    }

    fn create_ticket<'a>(
        &'a self,
        ticket: &'a NewTicket,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        let key = &ticket.idempotency_key;
        let id = format!("tk-{}", self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1);
        Box::pin(self.write(RemoteCall::CreateTicket(key.clone()), Some(key), Some(id)))
    }

    fn pay_ticket<'a>(
        &'a self,
        payment: &'a TicketPayment,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        let call = RemoteCall::PayTicket { ticket_id: payment.ticket_id.clone() };
        Box::pin(self.write(call, Some(&payment.idempotency_key), None))
    }

    fn bar_last_modified<'a>(
        &'a self,
        bar_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<u64>, RemoteError>> {
        Box::pin(async move {
            self.delay().await;
            self.record(RemoteCall::BarLastModified(bar_id.to_string()));
            Ok(self.bar_modified.lock().unwrap().get(bar_id).copied())
        })
    }

    fn update_bar<'a>(
        &'a self,
        updates: &'a BarUpdates,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        Box::pin(self.write(RemoteCall::UpdateBar(updates.bar_id.clone()), None, None))
    }

    fn add_salary<'a>(&'a self, salary: &'a NewSalary) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        let key = &salary.idempotency_key;
        Box::pin(self.write(RemoteCall::AddSalary(key.clone()), Some(key), None))
    }

    fn create_server_mapping<'a>(
        &'a self,
        mapping: &'a NewServerMapping,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        let call = RemoteCall::CreateServerMapping(mapping.server_name.clone());
        Box::pin(self.write(call, None, None))
    }
}

/// How [`MockCredentials`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMode {
    Valid,
    /// Stored session is expired; refresh succeeds.
    Expired,
    /// No session and refresh fails.
    Unavailable,
}

pub struct MockCredentials {
    mode: Mutex<CredentialMode>,
    gets: AtomicUsize,
    refreshes: AtomicUsize,
}

impl MockCredentials {
    pub fn new(mode: CredentialMode) -> Arc<Self> {
        Arc::new(MockCredentials {
            mode: Mutex::new(mode),
            gets: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn set_mode(&self, mode: CredentialMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl CredentialProvider for MockCredentials {
    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, CredentialError>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();
        Box::pin(async move {
            Ok(match mode {
                CredentialMode::Valid => Some(Session::new("token-valid", None)),
                CredentialMode::Expired => Some(Session::new("token-stale", Some(1))),
                CredentialMode::Unavailable => None,
            })
        })
    }

    fn refresh_session(&self) -> BoxFuture<'_, Result<Session, CredentialError>> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();
        Box::pin(async move {
            match mode {
                CredentialMode::Unavailable => {
                    Err(CredentialError::RefreshFailed("session revoked".to_string()))
                }
                _ => Ok(Session::new("token-fresh", None)),
            }
        })
    }
}

/// A wired monitor, queue and orchestrator over test doubles.
pub struct Harness {
    pub probe: Arc<MockProbe>,
    pub monitor: NetworkMonitor,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub queue: Arc<OperationQueue>,
    pub remote: Arc<MockRemote>,
    pub credentials: Arc<MockCredentials>,
    pub orchestrator: SyncOrchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_retry(RetryConfig::default())
    }

    pub fn with_retry(retry: RetryConfig) -> Self {
        let probe = MockProbe::new(ProbeOutcome::Reachable);
        let monitor = NetworkMonitor::new(MonitorConfig::default(), probe.clone());
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let queue = Arc::new(OperationQueue::open(store.clone(), clock.clone(), retry).unwrap());
        let remote = MockRemote::new();
        let credentials = MockCredentials::new(CredentialMode::Valid);
        let translations = IdTranslations::load(store.clone()).unwrap();
        let orchestrator = SyncOrchestrator::new(
            OrchestratorConfig::default(),
            monitor.clone(),
            queue.clone(),
            remote.clone(),
            credentials.clone(),
            translations,
            clock.clone(),
        );
        Harness { probe, monitor, store, clock, queue, remote, credentials, orchestrator }
    }

    pub fn enqueue(&self, mutation: Mutation) -> bs_core::OperationId {
        let bar_id = mutation.bar_id().to_string();
        let op = self.queue.enqueue(mutation, &bar_id, "user-1").unwrap();
        self.clock.advance(Duration::from_millis(10));
        op.id
    }
}
