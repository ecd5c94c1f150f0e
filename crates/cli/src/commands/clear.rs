// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::engine::Engine;
use crate::error::{Error, Result};

pub fn run(engine: &Engine, bar: Option<&str>, yes: bool) -> Result<()> {
    let removed = execute(engine, bar, yes)?;
    println!("Cleared {} operation(s)", removed);
    Ok(())
}

/// Deletes queued operations. Refuses unless confirmed, except when there
/// is nothing to delete.
pub(crate) fn execute(engine: &Engine, bar: Option<&str>, yes: bool) -> Result<usize> {
    let count = match bar {
        Some(bar) => engine.queue.stats_for_bar(bar).total_count,
        None => engine.queue.len(),
    };
    if count == 0 {
        return Ok(0);
    }
    if !yes {
        let scope = match bar {
            Some(bar) => format!("bar '{}'", bar),
            None => "the whole queue".to_string(),
        };
        return Err(Error::ConfirmationRequired { scope, count });
    }
    let removed = match bar {
        Some(bar) => engine.queue.clear_bar(bar)?,
        None => engine.orchestrator.clear_queue()?,
    };
    Ok(removed)
}

#[cfg(test)]
#[path = "clear_tests.rs"]
mod tests;
