// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bs_core::{OperationFilter, OperationStatus, SyncOperation};

use crate::cli::OutputFormat;
use crate::display::{format_operation_error, format_operation_line};
use crate::engine::Engine;
use crate::error::Result;

pub fn run(
    engine: &Engine,
    status: Option<&str>,
    bar: Option<&str>,
    output: OutputFormat,
) -> Result<()> {
    let ops = select(engine, status, bar)?;
    match output {
        OutputFormat::Text => {
            if ops.is_empty() {
                println!("No queued operations");
            }
            for op in &ops {
                println!("{}", format_operation_line(op));
                if let Some(error) = format_operation_error(op) {
                    println!("{}", error);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ops)?);
        }
    }
    Ok(())
}

/// Queued operations matching the filters, oldest first.
pub(crate) fn select(
    engine: &Engine,
    status: Option<&str>,
    bar: Option<&str>,
) -> Result<Vec<SyncOperation>> {
    let mut filter = OperationFilter::all();
    if let Some(status) = status {
        filter.status = Some(status.parse::<OperationStatus>()?);
    }
    if let Some(bar) = bar {
        filter = filter.for_bar(bar);
    }
    Ok(engine.queue.operations(&filter))
}

#[cfg(test)]
#[path = "list_tests.rs"]
mod tests;
