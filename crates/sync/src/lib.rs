// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! bs-sync: Offline-first synchronization engine.
//!
//! Components, leaf-first:
//! - [`NetworkMonitor`]: debounces noisy connectivity signals into a
//!   four-state status and a blocking decision
//! - [`OperationQueue`]: durable FIFO of pending mutations
//! - [`SyncOrchestrator`]: drains the queue against a [`RemoteAuthority`]
//!   with batching, conflict checks, and bounded retry
//! - [`SyncStatusProjector`]: read-only aggregate for status indicators
//!
//! Components are constructed instances with injected collaborators and a
//! `new -> init -> cleanup` lifecycle. Background work runs on the ambient
//! tokio runtime.

pub mod credentials;
pub mod monitor;
pub mod notify;
pub mod orchestrator;
pub mod queue;
pub mod recent;
pub mod remote;
mod runtime;
pub mod status;
pub mod store;
pub mod translations;

pub use credentials::{CredentialError, CredentialProvider, Session, StaticCredentials};
pub use monitor::{HttpProbe, MonitorConfig, NetworkMonitor, Probe, ProbeError};
pub use notify::{Listeners, Subscription};
pub use orchestrator::{
    CycleOutcome, CycleReport, OrchestratorConfig, SyncEvent, SyncOrchestrator,
};
pub use queue::{OperationQueue, QueueError, QueueEvent, QueueResult};
pub use recent::{RecentlySynced, SyncedEntry, RECENTLY_SYNCED_WINDOW};
pub use remote::{Ack, HttpRemote, ItemVerdict, RemoteAuthority, RemoteError, RemoteErrorKind};
pub use status::{SyncStatus, SyncStatusProjector};
pub use store::{DurableStore, FileStore, MemoryStore, SqliteStore, StoreError, StoreResult};
pub use runtime::BoxFuture;
pub use translations::IdTranslations;

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod scenario_tests;
