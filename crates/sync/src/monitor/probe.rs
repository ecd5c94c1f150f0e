// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reachability probes.
//!
//! Provides a trait-based probe so the monitor can run against:
//! - A real HTTP `HEAD` request in production
//! - Scripted outcomes in unit tests

use crate::runtime::BoxFuture;

/// Error type for probe failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    /// Request could not be completed.
    #[error("request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),
}

/// A single reachability check.
///
/// The monitor applies its own timeout around every call.
pub trait Probe: Send + Sync {
    fn probe(&self) -> BoxFuture<'_, Result<(), ProbeError>>;
}

/// Probes a URL with an uncached `HEAD` request.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: &str) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProbeError::Request(e.to_string()))?;
        Ok(HttpProbe { client, url: url.to_string() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Probe for HttpProbe {
    fn probe(&self) -> BoxFuture<'_, Result<(), ProbeError>> {
        Box::pin(async move {
            let response = self
                .client
                .head(&self.url)
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .send()
                .await
                .map_err(|e| ProbeError::Request(e.to_string()))?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(ProbeError::Status(status.as_u16()))
            }
        })
    }
}
