// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the CLI. Logs go to stderr so stdout stays parseable.

use tracing_subscriber::EnvFilter;

use crate::env;

/// Filter used when `BARSYNC_LOG` is unset.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(verbose: bool) {
    let filter = env::log_filter()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
