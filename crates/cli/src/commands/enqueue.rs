// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fs;
use std::path::Path;

use bs_core::{Mutation, MutationType, SyncOperation};
use serde_json::Value;

use crate::engine::Engine;
use crate::error::{Error, Result};

pub fn run(
    engine: &Engine,
    mutation_type: &str,
    bar: &str,
    user: &str,
    payload: Option<&str>,
    payload_file: Option<&Path>,
) -> Result<()> {
    let raw = read_payload(payload, payload_file)?;
    let op = execute(engine, mutation_type, bar, user, &raw)?;
    println!("Enqueued {} ({}): {}", op.id, op.mutation_type(), op.mutation.summary());
    Ok(())
}

pub(crate) fn read_payload(inline: Option<&str>, file: Option<&Path>) -> Result<String> {
    match (inline, file) {
        (Some(raw), _) => Ok(raw.to_string()),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|source| Error::PayloadFile { path: path.display().to_string(), source }),
        (None, None) => Ok("{}".to_string()),
    }
}

/// Payload field naming the acting user, filled from `--user` when absent.
fn actor_field(kind: MutationType) -> Option<&'static str> {
    match kind {
        MutationType::CreateSale => Some("sold_by"),
        MutationType::CreateReturn => Some("returned_by"),
        MutationType::CreateTicket => Some("created_by"),
        MutationType::PayTicket | MutationType::AddSalary => Some("paid_by"),
        MutationType::UpdateBar | MutationType::CreateServerMapping => None,
    }
}

/// Parses and queues a mutation. `bar_id` and the actor field default to
/// the operation scope.
pub(crate) fn execute(
    engine: &Engine,
    mutation_type: &str,
    bar: &str,
    user: &str,
    raw: &str,
) -> Result<SyncOperation> {
    let kind: MutationType = mutation_type.parse()?;
    let mut payload: Value = serde_json::from_str(raw)?;
    if let Some(object) = payload.as_object_mut() {
        object.entry("bar_id").or_insert_with(|| Value::String(bar.to_string()));
        if let Some(field) = actor_field(kind) {
            object.entry(field).or_insert_with(|| Value::String(user.to_string()));
        }
    }
    let mutation = Mutation::from_json(kind, payload)?;
    Ok(engine.queue.enqueue(mutation, bar, user)?)
}

#[cfg(test)]
#[path = "enqueue_tests.rs"]
mod tests;
