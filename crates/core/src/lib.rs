// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! bs-core: Data model for the barsync offline write path.
//!
//! This crate provides the typed mutations, queued operations, network
//! status model, and retry policy shared by the sync engine and the
//! `barsync` CLI. It performs no I/O.

pub mod clock;
pub mod error;
pub mod mutation;
pub mod network;
pub mod operation;
pub mod retry;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use mutation::{
    BarUpdates, IdempotencyKey, Mutation, MutationType, NewReturn, NewSale, NewSalary,
    NewServerMapping, NewTicket, SaleItem, TicketPayment,
};
pub use network::{NetworkDecision, NetworkQuality, NetworkStatus, SyncStrategy};
pub use operation::{
    FailureReason, OperationFilter, OperationId, OperationStatus, QueueStats, SyncOperation,
};
pub use retry::RetryConfig;
