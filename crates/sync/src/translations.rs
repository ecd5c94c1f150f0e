// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Temporary-to-permanent id translations.
//!
//! Tickets created offline are referenced by a local `temp_id` until the
//! remote assigns a real id. Once `CREATE_TICKET` syncs, the pair is stored
//! here (durably) and later payloads referencing the temporary id are
//! rewritten before dispatch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bs_core::Mutation;
use tracing::{debug, warn};

use crate::store::{DurableStore, StoreResult};

/// Store key holding the translation map.
pub const TRANSLATIONS_KEY: &str = "id-translations-v1";

pub struct IdTranslations {
    store: Arc<dyn DurableStore>,
    map: Mutex<HashMap<String, String>>,
}

impl IdTranslations {
    /// Loads persisted translations. A corrupt entry is discarded with a warning.
    pub fn load(store: Arc<dyn DurableStore>) -> StoreResult<Self> {
        let map = match store.get(TRANSLATIONS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("discarding unreadable id translations: {}", e);
                HashMap::new()
            }),
            None => HashMap::new(),
        };
        Ok(IdTranslations { store, map: Mutex::new(map) })
    }

    /// Records `temp_id -> remote_id`, persisting before it becomes visible.
    pub fn record(&self, temp_id: &str, remote_id: &str) -> StoreResult<()> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = map.clone();
        next.insert(temp_id.to_string(), remote_id.to_string());
        self.store.set(TRANSLATIONS_KEY, &serde_json::to_string(&next)?)?;
        *map = next;
        debug!(temp_id, remote_id, "recorded id translation");
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Option<String> {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).get(id).cloned()
    }

    /// Rewrites a temporary ticket reference in `mutation`. Returns whether
    /// anything changed.
    pub fn apply(&self, mutation: &mut Mutation) -> bool {
        match mutation.ticket_ref_mut() {
            Some(reference) => self.translate(reference),
            None => false,
        }
    }

    /// Replaces `reference` with its permanent id, if one is known.
    pub fn translate(&self, reference: &mut String) -> bool {
        match self.resolve(reference) {
            Some(remote_id) => {
                debug!(from = %reference, to = %remote_id, "translated ticket reference");
                *reference = remote_id;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.map.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "translations_tests.rs"]
mod tests;
