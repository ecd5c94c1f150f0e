// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote authority seam.
//!
//! One call per mutation type, each receiving its statically typed payload
//! (idempotency key included). Failures are classified by
//! [`RemoteErrorKind`]; only the transient kinds are retried.

mod http;

pub use http::HttpRemote;

use std::fmt;

use bs_core::{
    BarUpdates, FailureReason, IdempotencyKey, NewReturn, NewSalary, NewSale, NewServerMapping,
    NewTicket, TicketPayment,
};

use crate::credentials::Session;
use crate::runtime::BoxFuture;

/// Failure classes reported by the remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// Connection failure or server-side outage.
    Network,
    /// No answer within the call timeout.
    Timeout,
    RateLimited,
    /// Payload rejected as malformed.
    Validation,
    /// Payload violates a remote constraint (stock, uniqueness, ...).
    Constraint,
    /// Remote resource is newer than the local edit.
    Conflict,
    /// The remote does not handle this mutation.
    Unsupported,
    /// Credential rejected by the remote. Ends the cycle without charging
    /// any operation.
    Unauthorized,
}

impl RemoteErrorKind {
    /// Transient-network class, retried up to the retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteErrorKind::Network | RemoteErrorKind::Timeout | RemoteErrorKind::RateLimited
        )
    }

    /// Environmental failure: the whole cycle stops and operations stay pending.
    pub fn aborts_cycle(&self) -> bool {
        matches!(self, RemoteErrorKind::Unauthorized)
    }

    /// Terminal reason recorded for a fatal failure of this kind.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            RemoteErrorKind::Conflict => FailureReason::Conflict,
            _ => FailureReason::Validation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteErrorKind::Network => "network",
            RemoteErrorKind::Timeout => "timeout",
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::Validation => "validation",
            RemoteErrorKind::Constraint => "constraint",
            RemoteErrorKind::Conflict => "conflict",
            RemoteErrorKind::Unsupported => "unsupported",
            RemoteErrorKind::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified remote failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        RemoteError { kind, message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Timeout, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Conflict, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unauthorized, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Successful application of a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// Identifier assigned remotely, when the call creates a record.
    pub remote_id: Option<String>,
    /// The idempotency key had already been applied.
    pub duplicate: bool,
}

impl Ack {
    pub fn created(remote_id: impl Into<String>) -> Self {
        Ack { remote_id: Some(remote_id.into()), duplicate: false }
    }
}

/// Per-item outcome of a batched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemVerdict {
    pub idempotency_key: IdempotencyKey,
    pub result: Result<Ack, RemoteError>,
}

/// The remote system of record.
pub trait RemoteAuthority: Send + Sync {
    /// Receives the session verified at the start of a drain cycle.
    fn authorize(&self, _session: &Session) {}

    fn create_sale<'a>(&'a self, sale: &'a NewSale) -> BoxFuture<'a, Result<Ack, RemoteError>>;

    /// Applies several sales of one bar in a single call, returning one
    /// verdict per item keyed by idempotency key.
    fn create_sales_batch<'a>(
        &'a self,
        bar_id: &'a str,
        sales: &'a [NewSale],
    ) -> BoxFuture<'a, Result<Vec<ItemVerdict>, RemoteError>>;

    fn create_return<'a>(&'a self, ret: &'a NewReturn) -> BoxFuture<'a, Result<Ack, RemoteError>>;

    /// `remote_id` of the ack is the ticket's permanent id.
    fn create_ticket<'a>(
        &'a self,
        ticket: &'a NewTicket,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>>;

    fn pay_ticket<'a>(
        &'a self,
        payment: &'a TicketPayment,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>>;

    /// Last modification time of a bar, in milliseconds since Unix epoch.
    fn bar_last_modified<'a>(
        &'a self,
        bar_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<u64>, RemoteError>>;

    fn update_bar<'a>(&'a self, updates: &'a BarUpdates) -> BoxFuture<'a, Result<Ack, RemoteError>>;

    fn add_salary<'a>(&'a self, salary: &'a NewSalary) -> BoxFuture<'a, Result<Ack, RemoteError>>;

    fn create_server_mapping<'a>(
        &'a self,
        mapping: &'a NewServerMapping,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>>;
}

#[cfg(test)]
#[path = "remote_tests.rs"]
mod tests;
