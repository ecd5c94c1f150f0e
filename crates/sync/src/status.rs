// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Unified sync status for presentation layers.
//!
//! The projector combines network status, queue counts and orchestrator
//! activity into one [`SyncStatus`] value, recomputed from its sources on
//! every monitor, queue or orchestrator event. Subscribers only see values
//! that differ from the last one delivered.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use bs_core::{NetworkStatus, OperationFilter, OperationId, OperationStatus, SyncOperation};
use serde::Serialize;
use tracing::debug;

use crate::notify::{Listeners, Subscription};
use crate::orchestrator::{CycleReport, SyncEvent, SyncOrchestrator};
use crate::queue::{QueueEvent, QueueResult};

/// Snapshot of everything a status banner needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub network_status: NetworkStatus,
    pub pending_count: usize,
    pub syncing_count: usize,
    pub error_count: usize,
    pub total_count: usize,
    pub is_syncing: bool,
    /// Milliseconds since Unix epoch.
    pub last_sync_at: Option<u64>,
}

impl SyncStatus {
    pub fn is_online(&self) -> bool {
        self.network_status == NetworkStatus::Online
    }

    pub fn is_offline(&self) -> bool {
        self.network_status == NetworkStatus::Offline
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn has_pending(&self) -> bool {
        self.pending_count > 0
    }
}

struct Sources {
    orchestrator: SyncOrchestrator,
    listeners: Listeners<SyncStatus>,
    /// Last delivered status. Held from snapshot through delivery so
    /// concurrent refreshes deliver in the order they observed the sources.
    last: Mutex<Option<SyncStatus>>,
}

impl Sources {
    fn snapshot(&self) -> SyncStatus {
        let stats = self.orchestrator.queue().stats();
        SyncStatus {
            network_status: self.orchestrator.monitor().status(),
            pending_count: stats.pending_count,
            syncing_count: stats.syncing_count,
            error_count: stats.error_count,
            total_count: stats.total_count,
            is_syncing: self.orchestrator.is_syncing(),
            last_sync_at: self.orchestrator.last_sync_at(),
        }
    }

    fn lock_last(&self) -> MutexGuard<'_, Option<SyncStatus>> {
        self.last.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn refresh(&self) {
        let mut last = self.lock_last();
        let status = self.snapshot();
        if *last == Some(status) {
            return;
        }
        *last = Some(status);
        self.listeners.emit(&status);
    }
}

/// Read model over the monitor, queue and orchestrator.
pub struct SyncStatusProjector {
    sources: Arc<Sources>,
    _wiring: Vec<Subscription>,
}

impl SyncStatusProjector {
    pub fn new(orchestrator: SyncOrchestrator) -> Self {
        let sources = Arc::new(Sources {
            orchestrator,
            listeners: Listeners::new(),
            last: Mutex::new(None),
        });
        let wiring = vec![
            sources.orchestrator.monitor().subscribe(refresher::<NetworkStatus>(&sources)),
            sources.orchestrator.queue().subscribe(refresher::<QueueEvent>(&sources)),
            sources.orchestrator.subscribe(refresher::<SyncEvent>(&sources)),
        ];
        SyncStatusProjector { sources, _wiring: wiring }
    }

    /// Current status, computed from the sources.
    pub fn status(&self) -> SyncStatus {
        self.sources.snapshot()
    }

    /// Registers `listener`, delivering the current status right away.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SyncStatus) + Send + Sync + 'static,
    {
        let _last = self.sources.lock_last();
        listener(&self.sources.snapshot());
        self.sources.listeners.subscribe(listener)
    }

    /// Terminal operations, oldest first.
    pub fn errors(&self) -> Vec<SyncOperation> {
        self.queue_ops(OperationStatus::Error)
    }

    pub fn pending(&self) -> Vec<SyncOperation> {
        self.queue_ops(OperationStatus::Pending)
    }

    pub fn retry_all(&self) -> QueueResult<usize> {
        self.sources.orchestrator.retry_all()
    }

    pub fn retry_operation(&self, id: &OperationId) -> QueueResult<SyncOperation> {
        self.sources.orchestrator.retry_operation(id)
    }

    pub fn remove_operation(&self, id: &OperationId) -> QueueResult<bool> {
        self.sources.orchestrator.remove_operation(id)
    }

    /// Drops every queued operation. The caller confirms beforehand.
    pub fn clear_queue(&self) -> QueueResult<usize> {
        self.sources.orchestrator.clear_queue()
    }

    /// Probes connectivity now instead of waiting for the next tick.
    pub fn force_network_check(&self) {
        debug!("forcing network check");
        self.sources.orchestrator.monitor().force_check();
    }

    pub async fn force_sync(&self) -> QueueResult<CycleReport> {
        self.sources.orchestrator.force_sync().await
    }

    fn queue_ops(&self, status: OperationStatus) -> Vec<SyncOperation> {
        self.sources.orchestrator.queue().operations(&OperationFilter::with_status(status))
    }
}

/// Listener recomputing the status. Holds the sources weakly.
fn refresher<E: 'static>(sources: &Arc<Sources>) -> impl Fn(&E) + Send + Sync + 'static {
    let weak: Weak<Sources> = Arc::downgrade(sources);
    move |_| {
        if let Some(sources) = weak.upgrade() {
            sources.refresh();
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
