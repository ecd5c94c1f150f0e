// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bs_core::SyncOperation;

use super::{not_found, operation_id};
use crate::engine::Engine;
use crate::error::Result;

pub fn run(engine: &Engine, ids: &[String], all: bool) -> Result<()> {
    if all {
        let reset = engine.orchestrator.retry_all()?;
        println!("Queued {} operation(s) for retry", reset);
        return Ok(());
    }
    for op in retry_each(engine, ids)? {
        println!("{} is {}", op.id, op.status);
    }
    Ok(())
}

/// Resets each listed operation. Stops at the first unknown id.
pub(crate) fn retry_each(engine: &Engine, ids: &[String]) -> Result<Vec<SyncOperation>> {
    ids.iter()
        .map(|id| engine.orchestrator.retry_operation(&operation_id(id)).map_err(not_found))
        .collect()
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
