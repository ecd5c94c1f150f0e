// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Grouping of pending operations into dispatch steps.

use std::collections::HashSet;

use bs_core::{Mutation, NewSale, SyncOperation};

/// One unit of remote work within a drain cycle.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Single(SyncOperation),
    /// Sales of one bar applied in a single call, in queue order.
    Sales { bar_id: String, items: Vec<(SyncOperation, NewSale)> },
}

impl Step {
    pub(crate) fn len(&self) -> usize {
        match self {
            Step::Single(_) => 1,
            Step::Sales { items, .. } => items.len(),
        }
    }
}

/// Splits `ops` (already in FIFO order) into steps.
///
/// Adjacent batchable sales of the same bar are merged, up to `max_batch`
/// per step. Anything else, including a batch of one, is dispatched alone.
/// Relative order is never changed.
pub(crate) fn plan(ops: Vec<SyncOperation>, max_batch: usize) -> Vec<Step> {
    let mut steps: Vec<Step> = Vec::new();
    for op in ops {
        let sale = match &op.mutation {
            Mutation::CreateSale(sale) if op.mutation_type().batchable() && max_batch > 1 => {
                sale.clone()
            }
            _ => {
                steps.push(Step::Single(op));
                continue;
            }
        };
        if let Some(Step::Sales { bar_id, items }) = steps.last_mut() {
            if *bar_id == op.bar_id && items.len() < max_batch {
                items.push((op, sale));
                continue;
            }
        }
        steps.push(Step::Sales { bar_id: op.bar_id.clone(), items: vec![(op, sale)] });
    }
    steps.into_iter().map(unwrap_lone_batch).collect()
}

/// Keeps never-attempted operations, dropping every operation of a bar
/// from its first retried operation onwards so per-bar order holds.
pub(crate) fn first_attempts(ops: Vec<SyncOperation>) -> Vec<SyncOperation> {
    let mut held: HashSet<String> = HashSet::new();
    ops.into_iter()
        .filter(|op| {
            if op.retry_count > 0 {
                held.insert(op.bar_id.clone());
            }
            !held.contains(&op.bar_id)
        })
        .collect()
}

fn unwrap_lone_batch(step: Step) -> Step {
    match step {
        Step::Sales { mut items, .. } if items.len() == 1 => Step::Single(items.remove(0).0),
        other => other,
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
