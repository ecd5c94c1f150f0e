// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All errors surfaced by the `barsync` CLI.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("no state directory\n  hint: set state_dir in the config file or BARSYNC_STATE_DIR")]
    StateDirUnavailable,

    #[error("operation not found: {0}\n  hint: run 'barsync list' to see queued operations")]
    OperationNotFound(String),

    #[error("refusing to clear {scope} without confirmation\n  hint: pass --yes to delete {count} queued operation(s)")]
    ConfirmationRequired { scope: String, count: usize },

    #[error("failed to read payload file {path}: {source}")]
    PayloadFile { path: String, source: std::io::Error },

    #[error(transparent)]
    Mutation(#[from] bs_core::Error),

    #[error(transparent)]
    Queue(#[from] bs_sync::QueueError),

    #[error(transparent)]
    Store(#[from] bs_sync::StoreError),

    #[error("remote client error: {0}")]
    Remote(#[from] bs_sync::RemoteError),

    #[error("probe setup failed: {0}")]
    Probe(#[from] bs_sync::ProbeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
