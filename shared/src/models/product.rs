//! Product catalog models and stock level classification

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ParseEnumError;

/// A stock keeping unit owned by a tenant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: String,
    pub unit: StockUnit,
    /// Price per unit in whole currency units (Rupiah)
    pub price: i64,
    /// Quantity in the unit's base measure (grams for KG, etc.)
    pub quantity: i64,
    pub low_stock_threshold: Option<i64>,
    pub supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Current stock status derived from quantity and threshold
    pub fn stock_status(&self) -> StockStatus {
        classify_stock(self.quantity, self.low_stock_threshold)
    }
}

/// Unit of measure for a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockUnit {
    Gram,
    Kg,
    Ml,
    Pcs,
}

impl StockUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockUnit::Gram => "GRAM",
            StockUnit::Kg => "KG",
            StockUnit::Ml => "ML",
            StockUnit::Pcs => "PCS",
        }
    }
}

impl std::str::FromStr for StockUnit {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GRAM" => Ok(StockUnit::Gram),
            "KG" => Ok(StockUnit::Kg),
            "ML" => Ok(StockUnit::Ml),
            "PCS" => Ok(StockUnit::Pcs),
            _ => Err(ParseEnumError::new("unit", s)),
        }
    }
}

impl std::fmt::Display for StockUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock level of a product relative to its low stock threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Out,
    Critical,
    Warning,
    Safe,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Out => "out",
            StockStatus::Critical => "critical",
            StockStatus::Warning => "warning",
            StockStatus::Safe => "safe",
        }
    }

    /// Whether this status warrants a low stock notification
    pub fn is_alert(&self) -> bool {
        !matches!(self, StockStatus::Safe)
    }
}

impl std::str::FromStr for StockStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out" => Ok(StockStatus::Out),
            "critical" => Ok(StockStatus::Critical),
            "warning" => Ok(StockStatus::Warning),
            "safe" => Ok(StockStatus::Safe),
            _ => Err(ParseEnumError::new("stock status", s)),
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a stock level.
///
/// Empty stock is always `Out`. Without a positive threshold nothing else
/// alerts. At or below half the threshold is `Critical`, below the threshold
/// is `Warning`. The dashboard client calls this same function through the
/// WASM module.
pub fn classify_stock(quantity: i64, low_stock_threshold: Option<i64>) -> StockStatus {
    if quantity <= 0 {
        return StockStatus::Out;
    }
    let threshold = match low_stock_threshold {
        Some(t) if t > 0 => t,
        _ => return StockStatus::Safe,
    };
    // quantity <= threshold / 2 without integer truncation
    if quantity.saturating_mul(2) <= threshold {
        StockStatus::Critical
    } else if quantity < threshold {
        StockStatus::Warning
    } else {
        StockStatus::Safe
    }
}
