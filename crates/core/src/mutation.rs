// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed business mutations accepted by the offline write path.
//!
//! Every mutation kind carries its own payload struct, so each remote
//! handler receives a statically known shape. Kinds that a retried network
//! call could apply twice embed an [`IdempotencyKey`] generated when the
//! mutation is built, never regenerated afterwards.
//!
//! Serialized form (adjacently tagged):
//!
//! ```json
//! {"type": "CREATE_SALE", "payload": {"bar_id": "...", "items": [...], ...}}
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// The closed set of mutation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationType {
    CreateSale,
    CreateReturn,
    CreateTicket,
    PayTicket,
    UpdateBar,
    AddSalary,
    CreateServerMapping,
}

impl MutationType {
    /// Every mutation type, in declaration order.
    pub const ALL: [MutationType; 7] = [
        MutationType::CreateSale,
        MutationType::CreateReturn,
        MutationType::CreateTicket,
        MutationType::PayTicket,
        MutationType::UpdateBar,
        MutationType::AddSalary,
        MutationType::CreateServerMapping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationType::CreateSale => "CREATE_SALE",
            MutationType::CreateReturn => "CREATE_RETURN",
            MutationType::CreateTicket => "CREATE_TICKET",
            MutationType::PayTicket => "PAY_TICKET",
            MutationType::UpdateBar => "UPDATE_BAR",
            MutationType::AddSalary => "ADD_SALARY",
            MutationType::CreateServerMapping => "CREATE_SERVER_MAPPING",
        }
    }

    /// Whether contiguous operations of this type may share one remote call.
    pub fn batchable(&self) -> bool {
        matches!(self, MutationType::CreateSale)
    }

    /// Whether the remote resource must be checked for newer edits first.
    pub fn checks_conflicts(&self) -> bool {
        matches!(self, MutationType::UpdateBar)
    }

    /// Whether a synced mutation is kept briefly for optimistic rendering.
    pub fn buffers_recent(&self) -> bool {
        matches!(self, MutationType::CreateSale)
    }

    /// Whether the payload must carry an idempotency key.
    pub fn requires_idempotency_key(&self) -> bool {
        !matches!(self, MutationType::UpdateBar | MutationType::CreateServerMapping)
    }

    /// Read-model domain refreshed after a mutation of this type lands.
    pub fn domain(&self) -> &'static str {
        match self {
            MutationType::CreateSale => "sales",
            MutationType::CreateReturn => "returns",
            MutationType::CreateTicket | MutationType::PayTicket => "tickets",
            MutationType::UpdateBar => "bar",
            MutationType::AddSalary => "expenses",
            MutationType::CreateServerMapping => "servers",
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationType {
    type Err = Error;

    /// Accepts the canonical tag case-insensitively, with `-` for `_`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        MutationType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| Error::UnknownMutationType(s.to_string()))
    }
}

/// Client-generated key that lets the remote collapse duplicate submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generates a fresh random key.
    pub fn generate() -> Self {
        IdempotencyKey(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for IdempotencyKey {
    fn from(s: &str) -> Self {
        IdempotencyKey(s.to_string())
    }
}

impl From<String> for IdempotencyKey {
    fn from(s: String) -> Self {
        IdempotencyKey(s)
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line of a sale. Amounts are in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: i64,
    pub total_price: i64,
}

impl SaleItem {
    /// Builds a line whose total is `quantity * unit_price`.
    pub fn new(product_id: &str, product_name: &str, quantity: u32, unit_price: i64) -> Self {
        SaleItem {
            product_id: product_id.to_string(),
            product_name: product_name.to_string(),
            quantity,
            unit_price,
            total_price: i64::from(quantity) * unit_price,
        }
    }
}

fn default_sale_status() -> String {
    "validated".to_string()
}

/// Payload of `CREATE_SALE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub bar_id: String,
    pub items: Vec<SaleItem>,
    pub payment_method: String,
    pub sold_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    #[serde(default = "default_sale_status")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Fiscal day the sale belongs to (`YYYY-MM-DD`), owned by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_date: Option<String>,
    /// Ticket the sale is attached to; may be a local temporary id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    pub idempotency_key: IdempotencyKey,
}

impl NewSale {
    /// Creates a validated sale with a fresh idempotency key.
    pub fn new(bar_id: &str, sold_by: &str, payment_method: &str, items: Vec<SaleItem>) -> Self {
        NewSale {
            bar_id: bar_id.to_string(),
            items,
            payment_method: payment_method.to_string(),
            sold_by: sold_by.to_string(),
            server_id: None,
            status: default_sale_status(),
            customer_name: None,
            customer_phone: None,
            notes: None,
            business_date: None,
            ticket_id: None,
            idempotency_key: IdempotencyKey::generate(),
        }
    }

    /// Sum of line totals.
    pub fn total(&self) -> i64 {
        self.items.iter().map(|i| i.total_price).sum()
    }
}

/// Payload of `CREATE_RETURN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReturn {
    pub bar_id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub refund_amount: i64,
    pub reason: String,
    pub returned_by: String,
    pub idempotency_key: IdempotencyKey,
}

/// Payload of `CREATE_TICKET`.
///
/// `temp_id` names the ticket locally until the remote assigns its id;
/// later sales and payments may reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub bar_id: String,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
    pub closing_hour: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub temp_id: String,
    pub idempotency_key: IdempotencyKey,
}

impl NewTicket {
    /// Creates a ticket with a fresh temporary id and idempotency key.
    pub fn new(bar_id: &str, created_by: &str, closing_hour: u8) -> Self {
        NewTicket {
            bar_id: bar_id.to_string(),
            created_by: created_by.to_string(),
            notes: None,
            server_id: None,
            closing_hour,
            table_number: None,
            customer_name: None,
            temp_id: format!("temp-{}", uuid::Uuid::new_v4()),
            idempotency_key: IdempotencyKey::generate(),
        }
    }
}

/// Payload of `PAY_TICKET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPayment {
    pub bar_id: String,
    pub ticket_id: String,
    pub paid_by: String,
    pub payment_method: String,
    pub idempotency_key: IdempotencyKey,
}

impl TicketPayment {
    pub fn new(bar_id: &str, ticket_id: &str, paid_by: &str, payment_method: &str) -> Self {
        TicketPayment {
            bar_id: bar_id.to_string(),
            ticket_id: ticket_id.to_string(),
            paid_by: paid_by.to_string(),
            payment_method: payment_method.to_string(),
            idempotency_key: IdempotencyKey::generate(),
        }
    }
}

/// Payload of `UPDATE_BAR`. Absent fields are left untouched remotely.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BarUpdates {
    pub bar_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_hour: Option<u8>,
    /// Free-form settings object, merged remotely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

impl BarUpdates {
    pub fn new(bar_id: &str) -> Self {
        BarUpdates { bar_id: bar_id.to_string(), ..Default::default() }
    }

    /// Names of the fields this update touches.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.address.is_some() {
            fields.push("address");
        }
        if self.phone.is_some() {
            fields.push("phone");
        }
        if self.closing_hour.is_some() {
            fields.push("closing_hour");
        }
        if self.settings.is_some() {
            fields.push("settings");
        }
        fields
    }
}

/// Payload of `ADD_SALARY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSalary {
    pub bar_id: String,
    pub member_id: String,
    pub amount: i64,
    /// Pay period label, e.g. `2026-10`.
    pub period: String,
    pub paid_by: String,
    pub idempotency_key: IdempotencyKey,
}

/// Payload of `CREATE_SERVER_MAPPING`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewServerMapping {
    pub bar_id: String,
    pub server_name: String,
    pub user_id: String,
}

/// A business mutation with its typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutation {
    CreateSale(NewSale),
    CreateReturn(NewReturn),
    CreateTicket(NewTicket),
    PayTicket(TicketPayment),
    UpdateBar(BarUpdates),
    AddSalary(NewSalary),
    CreateServerMapping(NewServerMapping),
}

impl Mutation {
    /// Builds a mutation from an untyped JSON payload.
    ///
    /// A missing `idempotency_key` (and, for tickets, `temp_id`) is generated
    /// here, so the value is fixed before any network attempt.
    pub fn from_json(kind: MutationType, mut payload: Value) -> Result<Mutation> {
        let Some(object) = payload.as_object_mut() else {
            return Err(Error::InvalidPayload {
                mutation: kind.to_string(),
                reason: "payload must be a JSON object".to_string(),
            });
        };
        if kind.requires_idempotency_key() && !object.contains_key("idempotency_key") {
            object.insert(
                "idempotency_key".to_string(),
                Value::String(IdempotencyKey::generate().to_string()),
            );
        }
        if kind == MutationType::CreateTicket && !object.contains_key("temp_id") {
            object.insert(
                "temp_id".to_string(),
                Value::String(format!("temp-{}", uuid::Uuid::new_v4())),
            );
        }
        let tagged = serde_json::json!({ "type": kind.as_str(), "payload": payload });
        let mutation: Mutation = serde_json::from_value(tagged)?;
        mutation.validate()?;
        Ok(mutation)
    }

    pub fn mutation_type(&self) -> MutationType {
        match self {
            Mutation::CreateSale(_) => MutationType::CreateSale,
            Mutation::CreateReturn(_) => MutationType::CreateReturn,
            Mutation::CreateTicket(_) => MutationType::CreateTicket,
            Mutation::PayTicket(_) => MutationType::PayTicket,
            Mutation::UpdateBar(_) => MutationType::UpdateBar,
            Mutation::AddSalary(_) => MutationType::AddSalary,
            Mutation::CreateServerMapping(_) => MutationType::CreateServerMapping,
        }
    }

    /// The bar the payload itself targets.
    pub fn bar_id(&self) -> &str {
        match self {
            Mutation::CreateSale(p) => &p.bar_id,
            Mutation::CreateReturn(p) => &p.bar_id,
            Mutation::CreateTicket(p) => &p.bar_id,
            Mutation::PayTicket(p) => &p.bar_id,
            Mutation::UpdateBar(p) => &p.bar_id,
            Mutation::AddSalary(p) => &p.bar_id,
            Mutation::CreateServerMapping(p) => &p.bar_id,
        }
    }

    pub fn idempotency_key(&self) -> Option<&IdempotencyKey> {
        match self {
            Mutation::CreateSale(p) => Some(&p.idempotency_key),
            Mutation::CreateReturn(p) => Some(&p.idempotency_key),
            Mutation::CreateTicket(p) => Some(&p.idempotency_key),
            Mutation::PayTicket(p) => Some(&p.idempotency_key),
            Mutation::AddSalary(p) => Some(&p.idempotency_key),
            Mutation::UpdateBar(_) | Mutation::CreateServerMapping(_) => None,
        }
    }

    /// The ticket reference that may hold a local temporary id.
    pub fn ticket_ref_mut(&mut self) -> Option<&mut String> {
        match self {
            Mutation::CreateSale(p) => p.ticket_id.as_mut(),
            Mutation::PayTicket(p) => Some(&mut p.ticket_id),
            _ => None,
        }
    }

    /// Monetary total for kinds that carry one.
    pub fn total(&self) -> Option<i64> {
        match self {
            Mutation::CreateSale(p) => Some(p.total()),
            Mutation::CreateReturn(p) => Some(p.refund_amount),
            Mutation::AddSalary(p) => Some(p.amount),
            _ => None,
        }
    }

    /// Rejects payloads that could never be applied remotely.
    pub fn validate(&self) -> Result<()> {
        let kind = self.mutation_type();
        require(kind, "bar_id", self.bar_id())?;
        if let Some(key) = self.idempotency_key() {
            if key.is_empty() {
                return Err(Error::FieldRequired {
                    mutation: kind.to_string(),
                    field: "idempotency_key",
                });
            }
        }
        match self {
            Mutation::CreateSale(p) => {
                require(kind, "sold_by", &p.sold_by)?;
                if p.items.is_empty() {
                    return Err(Error::FieldRequired { mutation: kind.to_string(), field: "items" });
                }
                if let Some(item) = p.items.iter().find(|i| i.quantity == 0) {
                    let reason = format!("item '{}' has zero quantity", item.product_id);
                    return Err(invalid(kind, reason));
                }
            }
            Mutation::CreateReturn(p) => {
                require(kind, "sale_id", &p.sale_id)?;
                require(kind, "product_id", &p.product_id)?;
                if p.quantity == 0 {
                    return Err(invalid(kind, "quantity must be positive".to_string()));
                }
            }
            Mutation::CreateTicket(p) => {
                require(kind, "temp_id", &p.temp_id)?;
                require(kind, "created_by", &p.created_by)?;
                if p.closing_hour > 23 {
                    let reason = format!("closing_hour {} is not an hour", p.closing_hour);
                    return Err(invalid(kind, reason));
                }
            }
            Mutation::PayTicket(p) => {
                require(kind, "ticket_id", &p.ticket_id)?;
                require(kind, "paid_by", &p.paid_by)?;
            }
            Mutation::UpdateBar(p) => {
                if p.fields().is_empty() {
                    return Err(invalid(kind, "no fields to update".to_string()));
                }
            }
            Mutation::AddSalary(p) => {
                require(kind, "member_id", &p.member_id)?;
                if p.amount <= 0 {
                    return Err(invalid(kind, "amount must be positive".to_string()));
                }
            }
            Mutation::CreateServerMapping(p) => {
                require(kind, "server_name", &p.server_name)?;
                require(kind, "user_id", &p.user_id)?;
            }
        }
        Ok(())
    }

    /// One-line description for error listings.
    pub fn summary(&self) -> String {
        match self {
            Mutation::CreateSale(p) => {
                let units: u32 = p.items.iter().map(|i| i.quantity).sum();
                format!(
                    "sale of {} unit(s) in {} line(s), total {}",
                    units,
                    p.items.len(),
                    p.total()
                )
            }
            Mutation::CreateReturn(p) => {
                format!(
                    "return of {} x {} from sale {}, refund {}",
                    p.quantity, p.product_id, p.sale_id, p.refund_amount
                )
            }
            Mutation::CreateTicket(p) => match p.table_number {
                Some(table) => format!("ticket {} for table {}", p.temp_id, table),
                None => format!("ticket {}", p.temp_id),
            },
            Mutation::PayTicket(p) => {
                format!("payment of ticket {} by {}", p.ticket_id, p.payment_method)
            }
            Mutation::UpdateBar(p) => format!("bar settings update ({})", p.fields().join(", ")),
            Mutation::AddSalary(p) => {
                format!("salary {} for {} ({})", p.amount, p.member_id, p.period)
            }
            Mutation::CreateServerMapping(p) => {
                format!("server '{}' -> {}", p.server_name, p.user_id)
            }
        }
    }
}

fn require(kind: MutationType, field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::FieldRequired { mutation: kind.to_string(), field });
    }
    Ok(())
}

fn invalid(kind: MutationType, reason: String) -> Error {
    Error::InvalidPayload { mutation: kind.to_string(), reason }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
