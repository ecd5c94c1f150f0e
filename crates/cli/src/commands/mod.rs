// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod clear;
pub mod enqueue;
pub mod list;
pub mod remove;
pub mod retry;
pub mod run;
pub mod status;
pub mod sync;
#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

use std::future::Future;

use bs_core::OperationId;
use bs_sync::QueueError;

use crate::error::{Error, Result};

/// Runs `future` to completion on a fresh multi-threaded runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

/// Maps a queue miss to the CLI's not-found error.
pub(crate) fn not_found(err: QueueError) -> Error {
    match err {
        QueueError::NotFound(id) => Error::OperationNotFound(id.to_string()),
        other => other.into(),
    }
}

pub(crate) fn operation_id(raw: &str) -> OperationId {
    OperationId::from(raw.trim())
}
