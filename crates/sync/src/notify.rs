// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Listener registry shared by every observable component.
//!
//! `subscribe` returns a [`Subscription`] that unsubscribes when dropped.
//! `emit` snapshots the registered callbacks and invokes them outside the
//! registry lock, so a callback may subscribe or unsubscribe freely.

use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// A set of callbacks receiving `&T`.
pub struct Listeners<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Listeners { registry: Arc::new(Mutex::new(Registry { next_id: 0, entries: Vec::new() })) }
    }

    /// Registers `listener` until the returned handle is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.registry);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    let mut registry = registry.lock().unwrap_or_else(|e| e.into_inner());
                    registry.entries.retain(|(entry, _)| *entry != id);
                }
            })),
        }
    }

    /// Delivers `event` to every listener registered at call time.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Callback<T>> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in snapshot {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Listeners { registry: Arc::clone(&self.registry) }
    }
}

/// Handle returned by `subscribe`. Dropping it removes the listener.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Removes the listener now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
