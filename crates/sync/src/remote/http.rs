// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP remote authority speaking a PostgREST-style API.
//!
//! Creation and payment mutations go through idempotent RPC endpoints under
//! `rest/v1/rpc/`; plain inserts and the bar row go through table endpoints.
//! HTTP statuses and Postgres error codes are mapped onto
//! [`RemoteErrorKind`].

use std::sync::Mutex;

use bs_core::{
    BarUpdates, IdempotencyKey, NewReturn, NewSalary, NewSale, NewServerMapping, NewTicket,
    TicketPayment,
};
use chrono::DateTime;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Ack, ItemVerdict, RemoteAuthority, RemoteError, RemoteErrorKind};
use crate::credentials::Session;
use crate::runtime::BoxFuture;

/// Postgres unique violation, raised when an idempotency key is replayed.
const UNIQUE_VIOLATION: &str = "23505";

/// Remote authority over HTTP.
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    token: Mutex<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PgError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchRow {
    idempotency_key: String,
    success: bool,
    #[serde(default)]
    sale_id: Option<String>,
    #[serde(default)]
    duplicate: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BarRow {
    updated_at: Option<String>,
}

impl HttpRemote {
    /// Creates a client for `base_url` (the server root, without `/rest/v1`).
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RemoteError::network(e.to_string()))?;
        Ok(HttpRemote {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            token: Mutex::new(None),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut req = self.client.request(method, format!("{}/rest/v1/{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.header("apikey", key);
        }
        let token = self.token.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<(u16, String), RemoteError> {
        let response = req.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        Ok((status, body))
    }

    async fn post_ack(
        &self,
        path: &str,
        body: Result<Value, serde_json::Error>,
    ) -> Result<Ack, RemoteError> {
        let body = body.map_err(|e| RemoteError::validation(e.to_string()))?;
        let req = self
            .request(Method::POST, path)
            .header("Prefer", "return=representation")
            .json(&body);
        let (status, text) = self.send(req).await?;
        interpret(status, &text)
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::timeout(e.to_string())
    } else {
        RemoteError::network(e.to_string())
    }
}

/// Maps an HTTP response onto an ack or a classified error.
fn interpret(status: u16, body: &str) -> Result<Ack, RemoteError> {
    if (200..300).contains(&status) {
        return Ok(parse_ack(body));
    }

    let pg: PgError = serde_json::from_str(body).unwrap_or_default();
    let code = pg.code.unwrap_or_default();
    let message = pg.message.unwrap_or_else(|| format!("HTTP {}", status));
    if code == UNIQUE_VIOLATION && message.contains("idempotency") {
        return Ok(Ack { remote_id: None, duplicate: true });
    }

    let kind = match status {
        408 | 504 => RemoteErrorKind::Timeout,
        429 => RemoteErrorKind::RateLimited,
        401 | 403 => RemoteErrorKind::Unauthorized,
        404 | 405 | 501 => RemoteErrorKind::Unsupported,
        409 if code.starts_with("23") => RemoteErrorKind::Constraint,
        409 => RemoteErrorKind::Conflict,
        400..=499 if code.starts_with("23") => RemoteErrorKind::Constraint,
        400..=499 => RemoteErrorKind::Validation,
        _ => RemoteErrorKind::Network,
    };
    Err(RemoteError::new(kind, message))
}

/// Reads `{id, duplicate}` from an object, a one-row array, or a bare id.
fn parse_ack(body: &str) -> Ack {
    let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let record = match value {
        Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
        other => other,
    };
    let id_of = |v: &Value| {
        v.as_str().map(str::to_string).or_else(|| v.as_i64().map(|n| n.to_string()))
    };
    match &record {
        Value::Object(map) => Ack {
            remote_id: map.get("id").and_then(id_of),
            duplicate: map.get("duplicate").and_then(Value::as_bool).unwrap_or(false),
        },
        Value::String(_) | Value::Number(_) => Ack { remote_id: id_of(&record), duplicate: false },
        _ => Ack::default(),
    }
}

/// Classifies a per-item batch failure by its Postgres code.
fn batch_item_error(code: Option<&str>, message: String) -> RemoteError {
    let kind = match code {
        Some(c) if c.starts_with("23") => RemoteErrorKind::Constraint,
        Some("40001") | Some("57014") => RemoteErrorKind::Network,
        _ => RemoteErrorKind::Validation,
    };
    RemoteError::new(kind, message)
}

fn parse_batch(body: &str) -> Result<Vec<ItemVerdict>, RemoteError> {
    let rows: Vec<BatchRow> = serde_json::from_str(body)
        .map_err(|e| RemoteError::validation(format!("malformed batch response: {}", e)))?;
    Ok(rows
        .into_iter()
        .map(|row| ItemVerdict {
            idempotency_key: IdempotencyKey::from(row.idempotency_key),
            result: if row.success {
                Ok(Ack { remote_id: row.sale_id, duplicate: row.duplicate })
            } else {
                let message = row.error.unwrap_or_else(|| "rejected".to_string());
                Err(batch_item_error(row.error_code.as_deref(), message))
            },
        })
        .collect())
}

/// Parses the `updated_at` of the first bar row, in epoch milliseconds.
fn parse_last_modified(body: &str) -> Result<Option<u64>, RemoteError> {
    let rows: Vec<BarRow> = serde_json::from_str(body)
        .map_err(|e| RemoteError::validation(format!("malformed bar response: {}", e)))?;
    let Some(updated_at) = rows.into_iter().next().and_then(|r| r.updated_at) else {
        return Ok(None);
    };
    let parsed = DateTime::parse_from_rfc3339(&updated_at).map_err(|e| {
        RemoteError::validation(format!("invalid updated_at '{}': {}", updated_at, e))
    })?;
    Ok(Some(u64::try_from(parsed.timestamp_millis()).unwrap_or(0)))
}

impl RemoteAuthority for HttpRemote {
    fn authorize(&self, session: &Session) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.access_token.clone());
    }

    fn create_sale<'a>(&'a self, sale: &'a NewSale) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        Box::pin(self.post_ack("rpc/create_sale_idempotent", serde_json::to_value(sale)))
    }

    fn create_sales_batch<'a>(
        &'a self,
        bar_id: &'a str,
        sales: &'a [NewSale],
    ) -> BoxFuture<'a, Result<Vec<ItemVerdict>, RemoteError>> {
        Box::pin(async move {
            let body = json!({ "p_bar_id": bar_id, "p_sales": sales });
            let req = self.request(Method::POST, "rpc/create_sales_batch").json(&body);
            let (status, text) = self.send(req).await?;
            interpret(status, &text)?;
            parse_batch(&text)
        })
    }

    fn create_return<'a>(&'a self, ret: &'a NewReturn) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        Box::pin(self.post_ack("returns", serde_json::to_value(ret)))
    }

    fn create_ticket<'a>(
        &'a self,
        ticket: &'a NewTicket,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        Box::pin(self.post_ack("rpc/create_ticket", serde_json::to_value(ticket)))
    }

    fn pay_ticket<'a>(
        &'a self,
        payment: &'a TicketPayment,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        Box::pin(self.post_ack("rpc/pay_ticket", serde_json::to_value(payment)))
    }

    fn bar_last_modified<'a>(
        &'a self,
        bar_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<u64>, RemoteError>> {
        Box::pin(async move {
            let req = self
                .request(Method::GET, "bars")
                .query(&[("id", format!("eq.{}", bar_id)), ("select", "updated_at".to_string())]);
            let (status, text) = self.send(req).await?;
            interpret(status, &text)?;
            parse_last_modified(&text)
        })
    }

    fn update_bar<'a>(
        &'a self,
        updates: &'a BarUpdates,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        Box::pin(async move {
            let mut body =
                serde_json::to_value(updates).map_err(|e| RemoteError::validation(e.to_string()))?;
            if let Some(fields) = body.as_object_mut() {
                fields.remove("bar_id");
            }
            let req = self
                .request(Method::PATCH, "bars")
                .query(&[("id", format!("eq.{}", updates.bar_id))])
                .header("Prefer", "return=minimal")
                .json(&body);
            let (status, text) = self.send(req).await?;
            interpret(status, &text)
        })
    }

    fn add_salary<'a>(&'a self, salary: &'a NewSalary) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        Box::pin(self.post_ack("salaries", serde_json::to_value(salary)))
    }

    fn create_server_mapping<'a>(
        &'a self,
        mapping: &'a NewServerMapping,
    ) -> BoxFuture<'a, Result<Ack, RemoteError>> {
        Box::pin(self.post_ack("server_mappings", serde_json::to_value(mapping)))
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
