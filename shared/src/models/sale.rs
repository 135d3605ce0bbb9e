//! Sales (stock-out) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ParseEnumError;

/// An outbound stock movement. Every row is effective immediately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockOutTransaction {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub product_id: Uuid,
    /// Present only for recipe driven sales
    pub menu_id: Option<Uuid>,
    pub name: String,
    pub quantity: i64,
    pub transaction_date: DateTime<Utc>,
    pub note: Option<String>,
    pub source: StockOutSource,
    /// Shared by every row written by one CSV upload or one menu sale
    pub batch_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a stock-out row came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockOutSource {
    Manual,
    Csv,
    RecipeSale,
}

impl StockOutSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockOutSource::Manual => "MANUAL",
            StockOutSource::Csv => "CSV",
            StockOutSource::RecipeSale => "RECIPE_SALE",
        }
    }

    /// Only hand-entered rows may be edited or deleted individually
    pub fn is_editable(&self) -> bool {
        matches!(self, StockOutSource::Manual)
    }
}

impl std::str::FromStr for StockOutSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MANUAL" => Ok(StockOutSource::Manual),
            "CSV" => Ok(StockOutSource::Csv),
            "RECIPE_SALE" => Ok(StockOutSource::RecipeSale),
            _ => Err(ParseEnumError::new("stock-out source", s)),
        }
    }
}

impl std::fmt::Display for StockOutSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join the non-empty note fragments with the separator used across the ledger
pub fn join_notes<'a>(parts: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    let joined = parts
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
