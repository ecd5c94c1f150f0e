// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::tempdir;
use yare::parameterized;

fn exercise(store: &dyn DurableStore) {
    assert_eq!(store.get("sync-queue-v1").unwrap(), None);

    store.set("sync-queue-v1", "[1]").unwrap();
    assert_eq!(store.get("sync-queue-v1").unwrap().as_deref(), Some("[1]"));

    store.set("sync-queue-v1", "[1,2]").unwrap();
    assert_eq!(store.get("sync-queue-v1").unwrap().as_deref(), Some("[1,2]"));

    store.remove("sync-queue-v1").unwrap();
    assert_eq!(store.get("sync-queue-v1").unwrap(), None);

    // removing twice is fine
    store.remove("sync-queue-v1").unwrap();
}

#[test]
fn memory_store_basic() {
    exercise(&MemoryStore::new());
}

#[test]
fn file_store_basic() {
    let dir = tempdir().unwrap();
    exercise(&FileStore::open(dir.path()).unwrap());
}

#[test]
fn sqlite_store_basic() {
    exercise(&SqliteStore::open_in_memory().unwrap());
}

#[test]
fn memory_store_write_failure_propagates() {
    let store = MemoryStore::new();
    store.set("k", "v").unwrap();
    store.set_fail_writes(true);

    assert!(matches!(store.set("k", "w"), Err(StoreError::WriteRejected(_))));
    assert!(store.remove("k").is_err());
    assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

    store.set_fail_writes(false);
    store.set("k", "w").unwrap();
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    FileStore::open(dir.path()).unwrap().set("queue", "data").unwrap();

    let reopened = FileStore::open(dir.path()).unwrap();
    assert_eq!(reopened.get("queue").unwrap().as_deref(), Some("data"));
    assert!(!dir.path().join("queue.json.tmp").exists());
}

#[test]
fn file_store_creates_missing_dir() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let store = FileStore::open(&nested).unwrap();
    store.set("x", "1").unwrap();
    assert!(nested.join("x.json").exists());
}

#[test]
fn sqlite_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state").join("sync.db");
    {
        let store = SqliteStore::open(&path).unwrap();
        store.set("queue", "persisted").unwrap();
        assert!(store.updated_at("queue").unwrap().is_some());
    }
    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.get("queue").unwrap().as_deref(), Some("persisted"));
}

#[parameterized(
    empty = { "" },
    slash = { "a/b" },
    parent = { ".." },
    hidden = { ".queue" },
    space = { "my key" },
)]
fn invalid_keys_rejected(key: &str) {
    let dir = tempdir().unwrap();
    let file = FileStore::open(dir.path()).unwrap();
    assert!(matches!(file.set(key, "v"), Err(StoreError::InvalidKey(_))));
    assert!(matches!(MemoryStore::new().get(key), Err(StoreError::InvalidKey(_))));
}
