// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session credentials consulted once per drain cycle.

use crate::runtime::BoxFuture;

/// An access credential for the remote authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    /// Expiry in milliseconds since Unix epoch; `None` never expires.
    pub expires_at_ms: Option<u64>,
}

impl Session {
    pub fn new(access_token: &str, expires_at_ms: Option<u64>) -> Self {
        Session { access_token: access_token.to_string(), expires_at_ms }
    }

    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        !self.access_token.is_empty() && self.expires_at_ms.is_none_or(|exp| exp > now_ms)
    }
}

/// Error type for credential operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("no session available")]
    Missing,

    #[error("session refresh failed: {0}")]
    RefreshFailed(String),
}

/// Source of sessions.
pub trait CredentialProvider: Send + Sync {
    /// The current session, if any. Validity is checked by the caller.
    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, CredentialError>>;

    fn refresh_session(&self) -> BoxFuture<'_, Result<Session, CredentialError>>;
}

/// A fixed token, e.g. from configuration. Cannot be refreshed.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    session: Option<Session>,
}

impl StaticCredentials {
    pub fn new(token: Option<&str>) -> Self {
        let session = token.filter(|t| !t.is_empty()).map(|t| Session::new(t, None));
        StaticCredentials { session }
    }
}

impl CredentialProvider for StaticCredentials {
    fn get_session(&self) -> BoxFuture<'_, Result<Option<Session>, CredentialError>> {
        Box::pin(async move { Ok(self.session.clone()) })
    }

    fn refresh_session(&self) -> BoxFuture<'_, Result<Session, CredentialError>> {
        Box::pin(async move {
            match &self.session {
                Some(session) => Ok(session.clone()),
                None => Err(CredentialError::Missing),
            }
        })
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
