// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bs_sync::SyncEvent;
use tracing::{error, info};

use super::block_on;
use crate::display::format_report;
use crate::engine::Engine;
use crate::error::Result;

/// Runs the monitor and orchestrator until Ctrl-C.
pub fn run(engine: &Engine) -> Result<()> {
    block_on(async {
        let projector = engine.projector();
        let _status = projector.subscribe(|status| {
            info!(
                network = %status.network_status,
                pending = status.pending_count,
                failed = status.error_count,
                syncing = status.is_syncing,
                "sync status"
            );
        });
        let _events = engine.orchestrator.subscribe(|event| match event {
            SyncEvent::OperationFailed { id, mutation_type, message, terminal: true, .. } => {
                error!(
                    op_id = %id,
                    mutation = %mutation_type,
                    "operation needs attention: {}",
                    message
                );
            }
            SyncEvent::CycleCompleted(report) if report.ran() => info!("{}", format_report(report)),
            _ => {}
        });

        engine.monitor().init();
        engine.orchestrator.init();
        info!(probe_url = %engine.config.probe_url(), "barsync running, press Ctrl-C to stop");

        let stopped = tokio::signal::ctrl_c().await;
        info!("shutting down");
        engine.orchestrator.cleanup();
        engine.monitor().cleanup();
        stopped
    })??;
    Ok(())
}
