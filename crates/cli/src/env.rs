// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All runtime environment variables read by the CLI are named here and
//! exposed through typed accessors.

use std::path::PathBuf;

/// Environment variable names.
pub mod vars {
    pub const BARSYNC_CONFIG: &str = "BARSYNC_CONFIG";
    pub const BARSYNC_STATE_DIR: &str = "BARSYNC_STATE_DIR";
    pub const BARSYNC_TOKEN: &str = "BARSYNC_TOKEN";
    pub const BARSYNC_LOG: &str = "BARSYNC_LOG";
}

/// Returns the value of `BARSYNC_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    non_empty(vars::BARSYNC_CONFIG).map(PathBuf::from)
}

/// Returns the value of `BARSYNC_STATE_DIR` if set.
pub fn state_dir() -> Option<PathBuf> {
    non_empty(vars::BARSYNC_STATE_DIR).map(PathBuf::from)
}

/// Access token overriding `remote.access_token`.
pub fn token() -> Option<String> {
    non_empty(vars::BARSYNC_TOKEN)
}

/// Log filter directives, in `EnvFilter` syntax.
pub fn log_filter() -> Option<String> {
    non_empty(vars::BARSYNC_LOG)
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
