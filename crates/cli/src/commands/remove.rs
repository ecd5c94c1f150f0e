// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::operation_id;
use crate::engine::Engine;
use crate::error::{Error, Result};

pub fn run(engine: &Engine, id: &str) -> Result<()> {
    execute(engine, id)?;
    println!("Removed {}", id.trim());
    Ok(())
}

pub(crate) fn execute(engine: &Engine, id: &str) -> Result<()> {
    if engine.orchestrator.remove_operation(&operation_id(id))? {
        Ok(())
    } else {
        Err(Error::OperationNotFound(id.trim().to_string()))
    }
}

#[cfg(test)]
#[path = "remove_tests.rs"]
mod tests;
