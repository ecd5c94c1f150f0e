// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bs_core::{OperationFilter, OperationStatus};
use tracing::info;

use super::block_on;
use crate::display::{format_operation_error, format_operation_line, format_report};
use crate::engine::Engine;
use crate::error::Result;

pub fn run(engine: &Engine) -> Result<()> {
    let report = block_on(async {
        let network = engine.monitor().check_now().await;
        info!(%network, "network checked");
        engine.orchestrator.sync_all().await
    })?;

    println!("{}", format_report(&report));
    if report.failed > 0 {
        for op in engine.queue.operations(&OperationFilter::with_status(OperationStatus::Error)) {
            println!("{}", format_operation_line(&op));
            if let Some(error) = format_operation_error(&op) {
                println!("{}", error);
            }
        }
    }
    Ok(())
}
