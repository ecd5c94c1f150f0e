// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the sync engine from configuration.

use std::path::Path;
use std::sync::Arc;

use bs_core::{ClockSource, SystemClock};
use bs_sync::{
    DurableStore, FileStore, HttpProbe, HttpRemote, IdTranslations, NetworkMonitor, OperationQueue,
    SqliteStore, StaticCredentials, SyncOrchestrator, SyncStatusProjector,
};
use tracing::debug;

use crate::config::{Config, StoreBackend};
use crate::error::Result;

const DB_FILE_NAME: &str = "queue.db";
const FILE_STORE_DIR_NAME: &str = "queue";

/// Engine components for one CLI invocation.
///
/// Nothing here touches the network until [`NetworkMonitor::init`],
/// a probe, or a drain cycle runs.
pub struct Engine {
    pub config: Config,
    pub queue: Arc<OperationQueue>,
    pub orchestrator: SyncOrchestrator,
}

impl Engine {
    pub fn open(config: Config) -> Result<Engine> {
        let state_dir = config.state_dir()?;
        let store = open_store(config.store.backend, &state_dir)?;
        let clock: Arc<dyn ClockSource> = Arc::new(SystemClock);

        let queue =
            Arc::new(OperationQueue::open(store.clone(), clock.clone(), config.retry_config())?);
        let translations = IdTranslations::load(store)?;
        let probe = HttpProbe::new(&config.probe_url())?;
        let monitor = NetworkMonitor::new(config.monitor_config(), Arc::new(probe));
        let token = config.access_token();
        let orchestrator = SyncOrchestrator::new(
            config.orchestrator_config(),
            monitor,
            queue.clone(),
            Arc::new(HttpRemote::new(&config.remote.url, config.remote.api_key.as_deref())?),
            Arc::new(StaticCredentials::new(token.as_deref())),
            translations,
            clock,
        );

        Ok(Engine { config, queue, orchestrator })
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        self.orchestrator.monitor()
    }

    pub fn projector(&self) -> SyncStatusProjector {
        SyncStatusProjector::new(self.orchestrator.clone())
    }
}

fn open_store(backend: StoreBackend, state_dir: &Path) -> Result<Arc<dyn DurableStore>> {
    debug!(?backend, dir = %state_dir.display(), "opening store");
    let store: Arc<dyn DurableStore> = match backend {
        StoreBackend::Sqlite => Arc::new(SqliteStore::open(&state_dir.join(DB_FILE_NAME))?),
        StoreBackend::File => Arc::new(FileStore::open(&state_dir.join(FILE_STORE_DIR_NAME))?),
    };
    Ok(store)
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
