// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

#[test]
fn confirmation_error_names_scope_and_count() {
    let err = Error::ConfirmationRequired { scope: "bar 'bar-1'".to_string(), count: 3 };
    let msg = err.to_string();
    assert!(msg.contains("bar 'bar-1'"));
    assert!(msg.contains("--yes"));
    assert!(msg.contains("3 queued"));
}

#[test]
fn mutation_errors_keep_their_hint() {
    let err: Error = "NOPE".parse::<bs_core::MutationType>().unwrap_err().into();
    assert!(err.to_string().contains("hint: valid types are"));
}

#[test]
fn not_found_points_to_list() {
    let msg = Error::OperationNotFound("op-9".to_string()).to_string();
    assert!(msg.starts_with("operation not found: op-9"));
    assert!(msg.contains("barsync list"));
}
