//! Low stock notification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StockStatus;
use crate::types::ParseEnumError;

/// A persisted low stock notification, used for display and dedup only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub product_id: Uuid,
    pub status: StockStatus,
    pub message: String,
    pub severity: Severity,
    pub notified_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Notification severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Severity for an alerting stock status, `None` for safe stock
    pub fn for_status(status: StockStatus) -> Option<Self> {
        match status {
            StockStatus::Out | StockStatus::Critical => Some(Severity::Critical),
            StockStatus::Warning => Some(Severity::Warning),
            StockStatus::Safe => None,
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WARNING" => Ok(Severity::Warning),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(ParseEnumError::new("severity", s)),
        }
    }
}

/// Message shown for a product in an alerting status
pub fn low_stock_message(product_name: &str, status: StockStatus) -> Option<String> {
    match status {
        StockStatus::Out => Some(format!("Stok {} habis", product_name)),
        StockStatus::Critical => Some(format!("Stok {} kritis, segera lakukan pembelian", product_name)),
        StockStatus::Warning => Some(format!("Stok {} menipis", product_name)),
        StockStatus::Safe => None,
    }
}

/// An active low stock alert as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LowStockAlert {
    pub notification_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    pub low_stock_threshold: Option<i64>,
    pub status: StockStatus,
    pub severity: Severity,
    pub message: String,
    pub notified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_deterministic_per_status() {
        assert_eq!(low_stock_message("Gula", StockStatus::Out).as_deref(), Some("Stok Gula habis"));
        assert_eq!(
            low_stock_message("Gula", StockStatus::Warning),
            low_stock_message("Gula", StockStatus::Warning)
        );
        assert_ne!(
            low_stock_message("Gula", StockStatus::Warning),
            low_stock_message("Gula", StockStatus::Critical)
        );
        assert_eq!(low_stock_message("Gula", StockStatus::Safe), None);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Severity::for_status(StockStatus::Out), Some(Severity::Critical));
        assert_eq!(Severity::for_status(StockStatus::Critical), Some(Severity::Critical));
        assert_eq!(Severity::for_status(StockStatus::Warning), Some(Severity::Warning));
        assert_eq!(Severity::for_status(StockStatus::Safe), None);
    }
}
