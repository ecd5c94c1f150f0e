// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Short-lived record of just-synced mutations.
//!
//! A freshly created record may not show up in a read model queried right
//! after the sync call returns. Readers consult this buffer to keep showing
//! the locally known version until the window passes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bs_core::{ClockSource, IdempotencyKey, Mutation};

/// How long a synced mutation stays visible in the buffer.
pub const RECENTLY_SYNCED_WINDOW: Duration = Duration::from_secs(10);

/// A buffered mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedEntry {
    pub mutation: Mutation,
    pub total: Option<i64>,
    pub synced_at_ms: u64,
}

/// Time-bounded map keyed by idempotency key.
pub struct RecentlySynced {
    window: Duration,
    clock: Arc<dyn ClockSource>,
    entries: Mutex<HashMap<IdempotencyKey, SyncedEntry>>,
}

impl RecentlySynced {
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        Self::with_window(clock, RECENTLY_SYNCED_WINDOW)
    }

    pub fn with_window(clock: Arc<dyn ClockSource>, window: Duration) -> Self {
        RecentlySynced { window, clock, entries: Mutex::new(HashMap::new()) }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Records `mutation` as synced now. Mutations without a key are ignored.
    pub fn insert(&self, mutation: &Mutation) {
        let Some(key) = mutation.idempotency_key() else {
            return;
        };
        let entry = SyncedEntry {
            mutation: mutation.clone(),
            total: mutation.total(),
            synced_at_ms: self.clock.now_ms(),
        };
        self.lock().insert(key.clone(), entry);
    }

    /// The unexpired entry for `key`.
    pub fn get(&self, key: &IdempotencyKey) -> Option<SyncedEntry> {
        let now = self.clock.now_ms();
        self.lock().get(key).filter(|e| !self.expired(e, now)).cloned()
    }

    pub fn contains(&self, key: &IdempotencyKey) -> bool {
        self.get(key).is_some()
    }

    /// Unexpired entries, oldest first.
    pub fn snapshot(&self) -> Vec<(IdempotencyKey, SyncedEntry)> {
        let now = self.clock.now_ms();
        let mut live: Vec<_> = self
            .lock()
            .iter()
            .filter(|(_, e)| !self.expired(e, now))
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect();
        live.sort_by(|a, b| a.1.synced_at_ms.cmp(&b.1.synced_at_ms).then_with(|| a.0.cmp(&b.0)));
        live
    }

    /// Drops expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| !self.expired(e, now));
        before - entries.len()
    }

    /// Forgets `key`, e.g. once the read model has caught up.
    pub fn remove(&self, key: &IdempotencyKey) -> Option<SyncedEntry> {
        self.lock().remove(key)
    }

    fn expired(&self, entry: &SyncedEntry, now_ms: u64) -> bool {
        now_ms.saturating_sub(entry.synced_at_ms) >= self.window.as_millis() as u64
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<IdempotencyKey, SyncedEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "recent_tests.rs"]
mod tests;
