// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Drains the operation queue against the remote authority.
//!
//! A drain cycle runs when the network comes online, when an operation is
//! enqueued while online, on a periodic tick, or on demand. At most one
//! cycle runs at a time; a trigger arriving mid-cycle is honored by the
//! next one. Within a cycle operations are dispatched in FIFO order and
//! the cycle stops early if the monitor starts blocking.
//!
//! After a transient failure the background loop waits out the retry delay.
//! Wakes that arrive before the delay has elapsed only dispatch operations
//! that have never been attempted, and only for bars with no earlier
//! operation waiting on a retry.

mod batch;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bs_core::{
    ClockSource, FailureReason, IdempotencyKey, Mutation, MutationType, NetworkStatus, NewSale,
    OperationId, OperationStatus, SyncOperation, SyncStrategy,
};
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::credentials::{CredentialProvider, Session};
use crate::monitor::NetworkMonitor;
use crate::notify::{Listeners, Subscription};
use crate::queue::{OperationQueue, QueueEvent, QueueResult};
use crate::recent::RecentlySynced;
use crate::remote::{Ack, RemoteAuthority, RemoteError};
use crate::runtime;
use crate::translations::IdTranslations;

use batch::{first_attempts, plan, Step};

/// Timing knobs for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound on any single remote or credential call.
    pub call_timeout: Duration,
    /// Interval of the periodic drain tick.
    pub sync_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            call_timeout: Duration::from_secs(15),
            sync_interval: Duration::from_secs(30),
        }
    }
}

/// How a drain cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every eligible operation was attempted.
    Completed,
    /// The cycle did not start.
    Skipped(&'static str),
    /// Credentials were unavailable or rejected; no operation was charged.
    Aborted(String),
    /// The network went away or the orchestrator was stopped mid-cycle.
    Interrupted,
}

/// Summary of one drain cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub synced: usize,
    /// Failed with a transient error and left pending.
    pub retried: usize,
    /// Became terminal during this cycle.
    pub failed: usize,
    /// Batched calls issued.
    pub batches: usize,
    pub outcome: CycleOutcome,
}

impl CycleReport {
    fn new() -> Self {
        CycleReport {
            synced: 0,
            retried: 0,
            failed: 0,
            batches: 0,
            outcome: CycleOutcome::Completed,
        }
    }

    fn skipped(reason: &'static str) -> Self {
        CycleReport { outcome: CycleOutcome::Skipped(reason), ..Self::new() }
    }

    pub fn ran(&self) -> bool {
        !matches!(self.outcome, CycleOutcome::Skipped(_))
    }

    pub fn is_clean(&self) -> bool {
        self.outcome == CycleOutcome::Completed && self.retried == 0 && self.failed == 0
    }
}

/// Orchestrator notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    CycleStarted { pending: usize },
    OperationSynced {
        id: OperationId,
        mutation_type: MutationType,
        /// The remote had already applied this idempotency key.
        duplicate: bool,
    },
    OperationFailed {
        id: OperationId,
        mutation_type: MutationType,
        message: String,
        /// No further automatic retry.
        terminal: bool,
        reason: Option<FailureReason>,
    },
    CycleCompleted(CycleReport),
}

/// Which pending operations a cycle may dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    /// Never-attempted operations of bars with nothing waiting on a retry.
    FirstAttempts,
}

/// Whether a drain cycle goes on after a step.
#[must_use]
enum Flow {
    Continue,
    Abort(String),
}

struct Inner {
    config: OrchestratorConfig,
    monitor: NetworkMonitor,
    queue: Arc<OperationQueue>,
    remote: Arc<dyn RemoteAuthority>,
    credentials: Arc<dyn CredentialProvider>,
    clock: Arc<dyn ClockSource>,
    recent: RecentlySynced,
    translations: IdTranslations,
    syncing: AtomicBool,
    last_sync_at: Mutex<Option<u64>>,
    listeners: Listeners<SyncEvent>,
    trigger: Arc<Notify>,
    started: AtomicBool,
    cancel: CancellationToken,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Drives queued operations to the remote. Cloning shares the same instance.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

/// Clears the syncing flag even if the cycle future is dropped.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        monitor: NetworkMonitor,
        queue: Arc<OperationQueue>,
        remote: Arc<dyn RemoteAuthority>,
        credentials: Arc<dyn CredentialProvider>,
        translations: IdTranslations,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let recent = RecentlySynced::new(clock.clone());
        SyncOrchestrator {
            inner: Arc::new(Inner {
                config,
                monitor,
                queue,
                remote,
                credentials,
                clock,
                recent,
                translations,
                syncing: AtomicBool::new(false),
                last_sync_at: Mutex::new(None),
                listeners: Listeners::new(),
                trigger: Arc::new(Notify::new()),
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.inner.monitor
    }

    pub fn queue(&self) -> &Arc<OperationQueue> {
        &self.inner.queue
    }

    /// Sales applied within the last few seconds, for optimistic views.
    pub fn recently_synced(&self) -> &RecentlySynced {
        &self.inner.recent
    }

    pub fn translations(&self) -> &IdTranslations {
        &self.inner.translations
    }

    /// Starts the background drain loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(&self) {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            warn!("sync orchestrator already initialized");
            return;
        }
        info!(
            sync_interval_ms = self.inner.config.sync_interval.as_millis() as u64,
            "starting sync orchestrator"
        );

        let trigger = self.inner.trigger.clone();
        let on_network = self.inner.monitor.subscribe(move |status| {
            if *status == NetworkStatus::Online {
                trigger.notify_one();
            }
        });

        let trigger = self.inner.trigger.clone();
        let monitor = self.inner.monitor.clone();
        let on_queue = self.inner.queue.subscribe(move |event| {
            let enqueued = matches!(event, QueueEvent::Enqueued(_));
            if enqueued && monitor.status() == NetworkStatus::Online {
                trigger.notify_one();
            }
        });

        self.lock_subscriptions().extend([on_network, on_queue]);
        let orchestrator = self.clone();
        runtime::spawn("sync-orchestrator", async move { orchestrator.run().await });
    }

    /// Stops the drain loop after the current step and drops event wiring.
    pub fn cleanup(&self) {
        debug!("stopping sync orchestrator");
        self.inner.cancel.cancel();
        self.lock_subscriptions().clear();
    }

    /// Requests a drain cycle from the background loop.
    pub fn trigger(&self) {
        self.inner.trigger.notify_one();
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.inner.config.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures: u32 = 0;
        let mut retry_at: Option<Instant> = None;
        loop {
            let deadline = retry_at;
            let backoff = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                _ = self.inner.cancel.cancelled() => break,
                _ = self.inner.trigger.notified() => {}
                _ = ticker.tick() => {}
                _ = backoff => {}
            }

            let scope = match retry_at {
                Some(at) if Instant::now() < at => Scope::FirstAttempts,
                _ => {
                    retry_at = None;
                    Scope::All
                }
            };
            let report = self.cycle(scope).await;
            if !report.ran() || scope == Scope::FirstAttempts {
                continue;
            }
            let transient =
                report.retried > 0 || matches!(report.outcome, CycleOutcome::Aborted(_));
            if transient {
                let delay = self.inner.queue.retry_config().delay_for(failures);
                failures = failures.saturating_add(1);
                debug!(failures, delay_ms = delay.as_millis() as u64, "scheduling retry cycle");
                retry_at = Some(Instant::now() + delay);
            } else {
                failures = 0;
            }
        }
        debug!("sync orchestrator stopped");
    }

    /// Runs one drain cycle now and reports what happened.
    ///
    /// Returns a skipped report without side effects if a cycle is already
    /// running, the network is not online, or nothing is pending.
    pub async fn sync_all(&self) -> CycleReport {
        self.cycle(Scope::All).await
    }

    async fn cycle(&self, scope: Scope) -> CycleReport {
        if self.inner.syncing.swap(true, Ordering::AcqRel) {
            debug!("sync already in progress");
            return CycleReport::skipped("sync already in progress");
        }
        let report = {
            let _guard = CycleGuard(&self.inner.syncing);
            self.drain(scope).await
        };
        if report.ran() {
            if report.outcome == CycleOutcome::Completed {
                *self.inner.last_sync_at.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some(self.inner.clock.now_ms());
            }
            info!(
                synced = report.synced,
                retried = report.retried,
                failed = report.failed,
                batches = report.batches,
                outcome = ?report.outcome,
                "sync cycle finished"
            );
            self.inner.listeners.emit(&SyncEvent::CycleCompleted(report.clone()));
        }
        report
    }

    /// Resets terminal operations, then drains.
    pub async fn force_sync(&self) -> QueueResult<CycleReport> {
        self.inner.queue.retry_all()?;
        Ok(self.sync_all().await)
    }

    pub fn retry_all(&self) -> QueueResult<usize> {
        let reset = self.inner.queue.retry_all()?;
        if reset > 0 {
            self.trigger();
        }
        Ok(reset)
    }

    pub fn retry_operation(&self, id: &OperationId) -> QueueResult<SyncOperation> {
        let op = self.inner.queue.retry_operation(id)?;
        self.trigger();
        Ok(op)
    }

    pub fn remove_operation(&self, id: &OperationId) -> QueueResult<bool> {
        self.inner.queue.remove_operation(id)
    }

    pub fn clear_queue(&self) -> QueueResult<usize> {
        self.inner.queue.clear_queue()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.syncing.load(Ordering::Acquire)
    }

    /// Completion time of the last cycle that ran to the end.
    pub fn last_sync_at(&self) -> Option<u64> {
        *self.inner.last_sync_at.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(listener)
    }

    async fn drain(&self, scope: Scope) -> CycleReport {
        if self.inner.monitor.status() != NetworkStatus::Online {
            debug!(status = %self.inner.monitor.status(), "network not online, skipping sync");
            return CycleReport::skipped("network not online");
        }
        self.inner.recent.purge_expired();
        // Only one cycle runs at a time, so a syncing entry here is stranded.
        if let Err(e) = self.inner.queue.recover_interrupted() {
            error!(error = %e, "could not recover interrupted operations");
        }
        let mut pending = self.inner.queue.pending();
        if scope == Scope::FirstAttempts {
            pending = first_attempts(pending);
        }
        if pending.is_empty() {
            return CycleReport::skipped("nothing to sync");
        }

        self.inner.listeners.emit(&SyncEvent::CycleStarted { pending: pending.len() });
        let mut report = CycleReport::new();

        let session = match self.verify_session().await {
            Ok(session) => session,
            Err(reason) => {
                warn!(reason = %reason, "credentials unavailable, sync aborted");
                report.outcome = CycleOutcome::Aborted(reason);
                return report;
            }
        };
        self.inner.remote.authorize(&session);

        let strategy = SyncStrategy::for_quality(self.inner.monitor.quality());
        let steps = plan(pending, strategy.max_batch_size);
        debug!(
            steps = steps.len(),
            operations = steps.iter().map(Step::len).sum::<usize>(),
            max_batch = strategy.max_batch_size,
            op_delay_ms = strategy.op_delay.as_millis() as u64,
            "planned sync cycle"
        );

        let mut previous_single = false;
        for step in steps {
            if self.interrupted() {
                report.outcome = CycleOutcome::Interrupted;
                break;
            }
            let flow = match step {
                Step::Single(op) => {
                    if previous_single && !strategy.op_delay.is_zero() {
                        tokio::time::sleep(strategy.op_delay).await;
                        if self.interrupted() {
                            report.outcome = CycleOutcome::Interrupted;
                            break;
                        }
                    }
                    previous_single = true;
                    self.process_single(op, &mut report).await
                }
                Step::Sales { bar_id, items } => {
                    previous_single = false;
                    self.process_batch(&bar_id, items, &mut report).await
                }
            };
            if let Flow::Abort(reason) = flow {
                warn!(reason = %reason, "remote rejected credentials, sync aborted");
                report.outcome = CycleOutcome::Aborted(reason);
                break;
            }
        }
        report
    }

    fn interrupted(&self) -> bool {
        if self.inner.cancel.is_cancelled() {
            info!("orchestrator stopping, ending sync cycle early");
            return true;
        }
        if self.inner.monitor.decision().should_block {
            warn!("network lost, ending sync cycle early");
            return true;
        }
        false
    }

    /// Returns a usable session, refreshing once if needed.
    async fn verify_session(&self) -> Result<Session, String> {
        let now = self.inner.clock.now_ms();
        let current = self.bounded(self.inner.credentials.get_session()).await;
        match current {
            Some(Ok(Some(session))) if session.is_valid_at(now) => return Ok(session),
            Some(Err(e)) => debug!(error = %e, "could not read session, refreshing"),
            None => debug!("session lookup timed out, refreshing"),
            _ => debug!("session missing or expired, refreshing"),
        }
        match self.bounded(self.inner.credentials.refresh_session()).await {
            Some(Ok(session)) => Ok(session),
            Some(Err(e)) => Err(e.to_string()),
            None => Err("session refresh timed out".to_string()),
        }
    }

    /// Runs `call` under the call timeout; `None` means it timed out.
    async fn bounded<T>(&self, call: impl Future<Output = T>) -> Option<T> {
        tokio::time::timeout(self.inner.config.call_timeout, call).await.ok()
    }

    async fn remote_call<T>(
        &self,
        call: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        let timeout_ms = self.inner.config.call_timeout.as_millis();
        self.bounded(call).await.unwrap_or_else(|| {
            Err(RemoteError::timeout(format!("no response within {}ms", timeout_ms)))
        })
    }

    /// Marks `op` syncing if it is still pending in the queue.
    fn claim(&self, op: &SyncOperation) -> bool {
        match self.inner.queue.get(&op.id) {
            Some(current) if current.status == OperationStatus::Pending => {}
            _ => {
                debug!(op_id = %op.id, "operation changed since cycle start, skipping");
                return false;
            }
        }
        match self.inner.queue.update_operation_status(&op.id, OperationStatus::Syncing, None) {
            Ok(_) => true,
            Err(e) => {
                error!(op_id = %op.id, error = %e, "could not mark operation syncing");
                false
            }
        }
    }

    /// Returns a claimed operation to pending without charging an attempt.
    fn release(&self, op: &SyncOperation) {
        let queue = &self.inner.queue;
        if let Err(e) = queue.update_operation_status(&op.id, OperationStatus::Pending, None) {
            error!(op_id = %op.id, error = %e, "could not return operation to pending");
        }
    }

    async fn process_single(&self, op: SyncOperation, report: &mut CycleReport) -> Flow {
        if !self.claim(&op) {
            return Flow::Continue;
        }
        let mut mutation = op.mutation.clone();
        self.inner.translations.apply(&mut mutation);
        debug!(op_id = %op.id, kind = %op.mutation_type(), "dispatching operation");
        let result = self.dispatch(&op, &mutation).await;
        self.settle(&op, &mutation, result, report)
    }

    async fn process_batch(
        &self,
        bar_id: &str,
        items: Vec<(SyncOperation, NewSale)>,
        report: &mut CycleReport,
    ) -> Flow {
        let mut claimed = Vec::with_capacity(items.len());
        for (op, mut sale) in items {
            if !self.claim(&op) {
                continue;
            }
            if let Some(ticket_id) = sale.ticket_id.as_mut() {
                self.inner.translations.translate(ticket_id);
            }
            claimed.push((op, sale));
        }
        if claimed.is_empty() {
            return Flow::Continue;
        }

        report.batches += 1;
        let sales: Vec<NewSale> = claimed.iter().map(|(_, sale)| sale.clone()).collect();
        debug!(bar_id, size = sales.len(), "dispatching sales batch");
        let verdicts = self.remote_call(self.inner.remote.create_sales_batch(bar_id, &sales)).await;
        let mut by_key: HashMap<IdempotencyKey, Result<Ack, RemoteError>> = match verdicts {
            Ok(verdicts) => verdicts.into_iter().map(|v| (v.idempotency_key, v.result)).collect(),
            Err(e) => {
                warn!(bar_id, error = %e, "sales batch failed");
                claimed
                    .iter()
                    .map(|(_, sale)| (sale.idempotency_key.clone(), Err(e.clone())))
                    .collect()
            }
        };

        let mut flow = Flow::Continue;
        for (op, sale) in claimed {
            let result = by_key
                .remove(&sale.idempotency_key)
                .unwrap_or_else(|| Err(RemoteError::network("missing from batch response")));
            let settled = self.settle(&op, &Mutation::CreateSale(sale), result, report);
            if let Flow::Abort(reason) = settled {
                flow = Flow::Abort(reason);
            }
        }
        flow
    }

    async fn dispatch(&self, op: &SyncOperation, mutation: &Mutation) -> Result<Ack, RemoteError> {
        if mutation.mutation_type().checks_conflicts() {
            self.check_conflict(op).await?;
        }
        let remote = &self.inner.remote;
        match mutation {
            Mutation::CreateSale(sale) => self.remote_call(remote.create_sale(sale)).await,
            Mutation::CreateReturn(ret) => self.remote_call(remote.create_return(ret)).await,
            Mutation::CreateTicket(ticket) => self.remote_call(remote.create_ticket(ticket)).await,
            Mutation::PayTicket(payment) => self.remote_call(remote.pay_ticket(payment)).await,
            Mutation::UpdateBar(updates) => self.remote_call(remote.update_bar(updates)).await,
            Mutation::AddSalary(salary) => self.remote_call(remote.add_salary(salary)).await,
            Mutation::CreateServerMapping(mapping) => {
                self.remote_call(remote.create_server_mapping(mapping)).await
            }
        }
    }

    /// Rejects a local edit older than the remote's last change.
    async fn check_conflict(&self, op: &SyncOperation) -> Result<(), RemoteError> {
        let modified = self.remote_call(self.inner.remote.bar_last_modified(&op.bar_id)).await?;
        match modified {
            Some(remote_ms) if remote_ms > op.timestamp => Err(RemoteError::conflict(format!(
                "bar {} changed remotely at {} after this edit was made at {}",
                op.bar_id, remote_ms, op.timestamp
            ))),
            _ => Ok(()),
        }
    }

    fn settle(
        &self,
        op: &SyncOperation,
        mutation: &Mutation,
        result: Result<Ack, RemoteError>,
        report: &mut CycleReport,
    ) -> Flow {
        let kind = op.mutation_type();
        match result {
            Ok(ack) => {
                if let (Mutation::CreateTicket(ticket), Some(remote_id)) =
                    (mutation, ack.remote_id.as_deref())
                {
                    if let Err(e) = self.inner.translations.record(&ticket.temp_id, remote_id) {
                        error!(temp_id = %ticket.temp_id, error = %e, "could not record ticket id");
                    }
                }
                let queue = &self.inner.queue;
                let removed = queue.update_operation_status(&op.id, OperationStatus::Success, None);
                if let Err(e) = removed {
                    // Replayed next cycle; the idempotency key makes the replay a no-op.
                    error!(op_id = %op.id, error = %e, "could not remove synced operation");
                    report.retried += 1;
                    return Flow::Continue;
                }
                if kind.buffers_recent() {
                    self.inner.recent.insert(mutation);
                }
                if ack.duplicate {
                    info!(op_id = %op.id, kind = %kind, "remote had already applied operation");
                } else {
                    debug!(op_id = %op.id, kind = %kind, "operation synced");
                }
                report.synced += 1;
                self.inner.listeners.emit(&SyncEvent::OperationSynced {
                    id: op.id.clone(),
                    mutation_type: kind,
                    duplicate: ack.duplicate,
                });
            }
            Err(e) if e.kind.aborts_cycle() => {
                self.release(op);
                return Flow::Abort(e.to_string());
            }
            Err(e) if e.is_retryable() => {
                let message = e.to_string();
                let updated = self.inner.queue.update_operation_status(
                    &op.id,
                    OperationStatus::Error,
                    Some(&message),
                );
                let (terminal, reason) = match updated {
                    Ok(Some(updated)) => (updated.is_terminal(), updated.failure),
                    Ok(None) => (false, None),
                    Err(e) => {
                        error!(op_id = %op.id, error = %e, "could not record failed attempt");
                        (false, None)
                    }
                };
                self.record_failure(op, message, terminal, reason, report);
            }
            Err(e) => {
                let reason = e.kind.failure_reason();
                let message = e.to_string();
                match self.inner.queue.fail_permanently(&op.id, reason, &message) {
                    Ok(_) => self.record_failure(op, message, true, Some(reason), report),
                    Err(e) => {
                        error!(op_id = %op.id, error = %e, "could not record rejected operation");
                        self.record_failure(op, message, false, None, report);
                    }
                }
            }
        }
        Flow::Continue
    }

    fn record_failure(
        &self,
        op: &SyncOperation,
        message: String,
        terminal: bool,
        reason: Option<FailureReason>,
        report: &mut CycleReport,
    ) {
        let kind = op.mutation_type();
        if terminal {
            report.failed += 1;
            warn!(op_id = %op.id, kind = %kind, error = %message, "operation failed for good");
        } else {
            report.retried += 1;
            warn!(op_id = %op.id, kind = %kind, error = %message, "operation attempt failed");
        }
        self.inner.listeners.emit(&SyncEvent::OperationFailed {
            id: op.id.clone(),
            mutation_type: kind,
            message,
            terminal,
            reason,
        });
    }

    fn lock_subscriptions(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        self.inner.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
