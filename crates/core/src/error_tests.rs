// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    mutation_type = { Error::UnknownMutationType("SELL".into()), "unknown mutation type: 'SELL'" },
    status = { Error::InvalidStatus("done".into()), "invalid status: 'done'" },
    network = { Error::InvalidNetworkStatus("flaky".into()), "invalid network status: 'flaky'" },
)]
fn error_messages_include_hints(err: Error, prefix: &str) {
    let msg = err.to_string();
    assert!(msg.starts_with(prefix), "unexpected message: {msg}");
    assert!(msg.contains("\n  hint: valid"));
}

#[test]
fn field_required_names_mutation_and_field() {
    let err = Error::FieldRequired { mutation: "CREATE_SALE".into(), field: "items" };
    assert_eq!(err.to_string(), "CREATE_SALE: 'items' is required");
}

#[test]
fn json_errors_convert() {
    let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: Error = parse.into();
    assert!(err.to_string().starts_with("invalid payload: "));
}
