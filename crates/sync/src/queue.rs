// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, ordered queue of pending mutations.
//!
//! The whole queue is stored as one JSON array under [`QUEUE_KEY`]. Every
//! change is applied to a copy, written to the store, and only then
//! committed in memory: a failed write leaves the queue untouched and the
//! error reaches the caller. Each committed change fires a [`QueueEvent`].

use std::sync::{Arc, Mutex, MutexGuard};

use bs_core::{
    ClockSource, FailureReason, Mutation, OperationFilter, OperationId, OperationStatus, QueueStats,
    RetryConfig, SyncOperation,
};
use tracing::{debug, info, warn};

use crate::notify::{Listeners, Subscription};
use crate::store::{DurableStore, StoreError};

/// Store key holding the serialized queue.
pub const QUEUE_KEY: &str = "sync-queue-v1";

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Durable store failed; the change was not applied.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid mutation: {0}")]
    InvalidMutation(#[from] bs_core::Error),

    #[error("{0} is required for every operation")]
    MissingScope(&'static str),

    #[error("operation not found: {0}")]
    NotFound(OperationId),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    Enqueued(SyncOperation),
    Updated(SyncOperation),
    Removed(OperationId),
    Cleared { bar_id: Option<String>, removed: usize },
}

/// Durable FIFO of [`SyncOperation`]s.
pub struct OperationQueue {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn ClockSource>,
    retry: RetryConfig,
    ops: Mutex<Vec<SyncOperation>>,
    listeners: Listeners<QueueEvent>,
}

impl OperationQueue {
    /// Loads the queue from `store`.
    ///
    /// Operations left `syncing` by a previous process are returned to
    /// `pending`: their call never reported back.
    pub fn open(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn ClockSource>,
        retry: RetryConfig,
    ) -> QueueResult<Self> {
        let ops: Vec<SyncOperation> = match store.get(QUEUE_KEY)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        };
        let queue = OperationQueue {
            store,
            clock,
            retry,
            ops: Mutex::new(ops),
            listeners: Listeners::new(),
        };
        let recovered = queue.recover_interrupted()?;
        debug!(operations = queue.len(), recovered, "opened operation queue");
        Ok(queue)
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Appends a mutation as a new pending operation and persists it.
    ///
    /// Fails without side effects if the scope is blank, the payload is
    /// invalid, or the store write fails.
    pub fn enqueue(
        &self,
        mutation: Mutation,
        bar_id: &str,
        user_id: &str,
    ) -> QueueResult<SyncOperation> {
        if bar_id.trim().is_empty() {
            return Err(QueueError::MissingScope("bar_id"));
        }
        if user_id.trim().is_empty() {
            return Err(QueueError::MissingScope("user_id"));
        }
        mutation.validate()?;
        if mutation.bar_id() != bar_id {
            return Err(bs_core::Error::InvalidPayload {
                mutation: mutation.mutation_type().to_string(),
                reason: format!(
                    "payload bar '{}' does not match operation bar '{}'",
                    mutation.bar_id(),
                    bar_id
                ),
            }
            .into());
        }

        let now = self.clock.now_ms();
        let op = self.mutate(|ops| {
            // Never stamp earlier than the tail, so timestamp order stays FIFO.
            let timestamp = ops.iter().map(|o| o.timestamp).max().map_or(now, |last| last.max(now));
            let op = SyncOperation::new(mutation, bar_id, user_id, timestamp);
            ops.push(op.clone());
            Ok(op)
        })?;

        info!(op_id = %op.id, mutation = %op.mutation_type(), bar_id, "enqueued operation");
        self.listeners.emit(&QueueEvent::Enqueued(op.clone()));
        Ok(op)
    }

    /// Operations matching `filter`, ordered by timestamp then insertion.
    pub fn operations(&self, filter: &OperationFilter) -> Vec<SyncOperation> {
        let mut matching: Vec<SyncOperation> =
            self.lock().iter().filter(|op| filter.matches(op)).cloned().collect();
        matching.sort_by_key(|op| op.timestamp);
        matching
    }

    pub fn pending(&self) -> Vec<SyncOperation> {
        self.operations(&OperationFilter::with_status(OperationStatus::Pending))
    }

    pub fn get(&self, id: &OperationId) -> Option<SyncOperation> {
        self.lock().iter().find(|op| &op.id == id).cloned()
    }

    /// Applies a status transition.
    ///
    /// - `success` removes the operation (returns `None`)
    /// - `error` counts a failed attempt and returns to `pending` while the
    ///   retry budget allows, otherwise becomes terminal
    /// - `syncing` stamps the attempt time
    pub fn update_operation_status(
        &self,
        id: &OperationId,
        status: OperationStatus,
        error_message: Option<&str>,
    ) -> QueueResult<Option<SyncOperation>> {
        if status == OperationStatus::Success {
            self.mutate(|ops| {
                let index = position(ops, id)?;
                ops.remove(index);
                Ok(())
            })?;
            debug!(op_id = %id, "operation synced, removed from queue");
            self.listeners.emit(&QueueEvent::Removed(id.clone()));
            return Ok(None);
        }

        let now = self.clock.now_ms();
        let retry = self.retry;
        let updated = self.mutate(|ops| {
            let index = position(ops, id)?;
            let op = &mut ops[index];
            match status {
                OperationStatus::Syncing => {
                    op.status = OperationStatus::Syncing;
                    op.last_attempt_at = Some(now);
                }
                OperationStatus::Error => {
                    op.retry_count += 1;
                    op.last_attempt_at = Some(now);
                    op.error_message = error_message.map(str::to_string);
                    if retry.allows_retry(op.retry_count) {
                        op.status = OperationStatus::Pending;
                    } else {
                        op.status = OperationStatus::Error;
                        op.failure = Some(FailureReason::RetriesExhausted);
                    }
                }
                OperationStatus::Pending | OperationStatus::Success => {
                    op.status = OperationStatus::Pending;
                }
            }
            Ok(op.clone())
        })?;

        if updated.status == OperationStatus::Error {
            warn!(op_id = %id, attempts = updated.retry_count, "operation exhausted its retries");
        }
        self.listeners.emit(&QueueEvent::Updated(updated.clone()));
        Ok(Some(updated))
    }

    /// Marks an operation terminal without consulting the retry budget.
    pub fn fail_permanently(
        &self,
        id: &OperationId,
        reason: FailureReason,
        message: &str,
    ) -> QueueResult<SyncOperation> {
        let now = self.clock.now_ms();
        let failed = self.mutate(|ops| {
            let index = position(ops, id)?;
            let op = &mut ops[index];
            op.retry_count += 1;
            op.last_attempt_at = Some(now);
            op.status = OperationStatus::Error;
            op.failure = Some(reason);
            op.error_message = Some(message.to_string());
            Ok(op.clone())
        })?;
        self.listeners.emit(&QueueEvent::Updated(failed.clone()));
        Ok(failed)
    }

    /// Returns a terminal operation to `pending` with a fresh retry budget.
    /// Non-terminal operations are returned unchanged.
    pub fn retry_operation(&self, id: &OperationId) -> QueueResult<SyncOperation> {
        let (op, changed) = self.mutate(|ops| {
            let index = position(ops, id)?;
            let changed = reset_terminal(&mut ops[index]);
            Ok((ops[index].clone(), changed))
        })?;
        if changed {
            info!(op_id = %id, "operation queued for retry");
            self.listeners.emit(&QueueEvent::Updated(op.clone()));
        }
        Ok(op)
    }

    /// Resets every terminal operation. Returns how many were reset.
    pub fn retry_all(&self) -> QueueResult<usize> {
        let reset = self.mutate(|ops| {
            let mut reset = Vec::new();
            for op in ops.iter_mut() {
                if reset_terminal(op) {
                    reset.push(op.clone());
                }
            }
            Ok(reset)
        })?;
        if !reset.is_empty() {
            info!(count = reset.len(), "operations queued for retry");
        }
        for op in &reset {
            self.listeners.emit(&QueueEvent::Updated(op.clone()));
        }
        Ok(reset.len())
    }

    /// Removes an operation. Returns `false` if it was not queued.
    pub fn remove_operation(&self, id: &OperationId) -> QueueResult<bool> {
        let removed = self.mutate(|ops| {
            let before = ops.len();
            ops.retain(|op| &op.id != id);
            Ok(ops.len() != before)
        })?;
        if removed {
            info!(op_id = %id, "removed operation");
            self.listeners.emit(&QueueEvent::Removed(id.clone()));
        }
        Ok(removed)
    }

    /// Deletes every operation. The caller has already confirmed.
    pub fn clear_queue(&self) -> QueueResult<usize> {
        self.clear_where(None)
    }

    /// Deletes every operation of one bar.
    pub fn clear_bar(&self, bar_id: &str) -> QueueResult<usize> {
        self.clear_where(Some(bar_id))
    }

    fn clear_where(&self, bar_id: Option<&str>) -> QueueResult<usize> {
        let removed = self.mutate(|ops| {
            let before = ops.len();
            match bar_id {
                Some(bar) => ops.retain(|op| op.bar_id != bar),
                None => ops.clear(),
            }
            Ok(before - ops.len())
        })?;
        warn!(removed, bar_id = bar_id.unwrap_or("*"), "cleared operation queue");
        self.listeners.emit(&QueueEvent::Cleared { bar_id: bar_id.map(str::to_string), removed });
        Ok(removed)
    }

    /// Returns operations stuck in `syncing` to `pending` without charging
    /// their retry budget.
    pub fn recover_interrupted(&self) -> QueueResult<usize> {
        let stuck = self
            .lock()
            .iter()
            .any(|op| op.status == OperationStatus::Syncing);
        if !stuck {
            return Ok(0);
        }
        let recovered = self.mutate(|ops| {
            let mut recovered = Vec::new();
            for op in ops.iter_mut().filter(|op| op.status == OperationStatus::Syncing) {
                op.status = OperationStatus::Pending;
                recovered.push(op.clone());
            }
            Ok(recovered)
        })?;
        warn!(count = recovered.len(), "recovered interrupted operations");
        for op in &recovered {
            self.listeners.emit(&QueueEvent::Updated(op.clone()));
        }
        Ok(recovered.len())
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats::from_operations(self.lock().iter())
    }

    pub fn stats_for_bar(&self, bar_id: &str) -> QueueStats {
        QueueStats::from_operations(self.lock().iter().filter(|op| op.bar_id == bar_id))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers a change listener.
    ///
    /// Listeners run after the change is committed and may read the queue.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    fn mutate<R>(
        &self,
        change: impl FnOnce(&mut Vec<SyncOperation>) -> QueueResult<R>,
    ) -> QueueResult<R> {
        let mut ops = self.lock();
        let mut next = ops.clone();
        let out = change(&mut next)?;
        let raw = serde_json::to_string(&next)?;
        self.store.set(QUEUE_KEY, &raw)?;
        *ops = next;
        Ok(out)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SyncOperation>> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn position(ops: &[SyncOperation], id: &OperationId) -> QueueResult<usize> {
    ops.iter().position(|op| &op.id == id).ok_or_else(|| QueueError::NotFound(id.clone()))
}

fn reset_terminal(op: &mut SyncOperation) -> bool {
    if op.status != OperationStatus::Error {
        return false;
    }
    op.status = OperationStatus::Pending;
    op.retry_count = 0;
    op.failure = None;
    op.error_message = None;
    true
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
