// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background task spawning on the ambient tokio runtime.

use std::future::Future;

use tokio::runtime::Handle;
use tracing::error;

/// Spawns `task` on the current runtime.
///
/// Outside a runtime the task is dropped and the failure logged; callers
/// are signal handlers that must not panic.
pub(crate) fn spawn<F>(what: &'static str, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(e) => error!(task = what, "no async runtime available: {}", e),
    }
}

/// Boxed future returned by the async collaborator traits.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn Future<Output = T> + Send + 'a>>;
