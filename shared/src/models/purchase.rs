//! Purchase (stock-in) models and the status driven stock effect

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ParseEnumError;

/// An inbound stock movement tied to a supplier purchase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockInTransaction {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub product_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub name: String,
    pub quantity: i64,
    pub total_amount: i64,
    pub status: PurchaseStatus,
    pub payment_method: String,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockInTransaction {
    /// The (status, quantity) pair that determines this row's stock effect
    pub fn effect(&self) -> PurchaseEffect {
        PurchaseEffect {
            status: self.status,
            quantity: self.quantity,
        }
    }
}

/// Purchase lifecycle status. Only `Completed` affects stock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "PENDING",
            PurchaseStatus::Completed => "COMPLETED",
            PurchaseStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for PurchaseStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PurchaseStatus::Pending),
            "COMPLETED" => Ok(PurchaseStatus::Completed),
            "CANCELLED" => Ok(PurchaseStatus::Cancelled),
            _ => Err(ParseEnumError::new("purchase status", s)),
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status and quantity of a purchase row at one point in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseEffect {
    pub status: PurchaseStatus,
    pub quantity: i64,
}

impl PurchaseEffect {
    pub fn new(status: PurchaseStatus, quantity: i64) -> Self {
        Self { status, quantity }
    }

    /// Stock contributed by a row in this state
    pub fn contribution(&self) -> i64 {
        match self.status {
            PurchaseStatus::Completed => self.quantity,
            PurchaseStatus::Pending | PurchaseStatus::Cancelled => 0,
        }
    }
}

/// Net change to product quantity when a purchase moves from `old` to `new`.
///
/// `None` on the old side is a create, `None` on the new side is a delete.
/// Both sides must refer to the same product; callers moving a purchase
/// between products apply `-old.contribution()` and `new.contribution()`
/// to each product separately.
pub fn purchase_stock_delta(old: Option<PurchaseEffect>, new: Option<PurchaseEffect>) -> i64 {
    let before = old.map(|e| e.contribution()).unwrap_or(0);
    let after = new.map(|e| e.contribution()).unwrap_or(0);
    after.saturating_sub(before)
}
