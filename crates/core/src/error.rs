// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors raised while building or parsing data-model values.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown mutation type: '{0}'\n  hint: valid types are: CREATE_SALE, CREATE_RETURN, CREATE_TICKET, PAY_TICKET, UPDATE_BAR, ADD_SALARY, CREATE_SERVER_MAPPING")]
    UnknownMutationType(String),

    #[error("invalid status: '{0}'\n  hint: valid statuses are: pending, syncing, success, error")]
    InvalidStatus(String),

    #[error("invalid network status: '{0}'\n  hint: valid statuses are: online, offline, unstable, checking")]
    InvalidNetworkStatus(String),

    #[error("{mutation}: '{field}' is required")]
    FieldRequired { mutation: String, field: &'static str },

    #[error("{mutation}: {reason}")]
    InvalidPayload { mutation: String, reason: String },

    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for data-model operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
