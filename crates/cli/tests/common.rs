// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Nothing listens here, so probes fail fast.
pub const UNREACHABLE: &str = "http://127.0.0.1:9";

/// A temp directory holding a config file and the queue state.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_backend("sqlite")
    }

    pub fn with_backend(backend: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let config = format!(
            "state_dir = \"state\"\n\n[store]\nbackend = \"{backend}\"\n\n[network]\nprobe_timeout_ms = 2000\n\n[remote]\nurl = \"{UNREACHABLE}\"\ncall_timeout_ms = 2000\n"
        );
        fs::write(dir.path().join("config.toml"), config).unwrap();
        Workspace { dir }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("barsync");
        cmd.env("BARSYNC_CONFIG", self.dir.path().join("config.toml"))
            .env_remove("BARSYNC_STATE_DIR")
            .env_remove("BARSYNC_TOKEN")
            .env("BARSYNC_LOG", "off")
            .current_dir(self.dir.path());
        cmd
    }

    /// Enqueue a ticket and return its operation id.
    pub fn ticket(&self, bar: &str) -> String {
        let output = self
            .cmd()
            .args(["enqueue", "CREATE_TICKET", "--bar", bar, "--user", "user-1"])
            .args(["--payload", r#"{"closing_hour":4}"#])
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .nth(1)
            .unwrap()
            .to_string()
    }

    /// Operations as JSON values, via `list -o json`.
    pub fn list_json(&self) -> Vec<serde_json::Value> {
        let output = self.cmd().args(["list", "-o", "json"]).output().unwrap();
        assert!(output.status.success());
        serde_json::from_slice(&output.stdout).unwrap()
    }
}
