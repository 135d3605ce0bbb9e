//! WebAssembly module for the Kedai dashboard
//!
//! Exposes the stock rules the backend uses so the browser can:
//! - classify stock levels exactly like the low stock notifier
//! - preview recipe deductions before a menu sale
//! - preview the stock effect of a purchase status change
//!
//! Quantities cross the boundary as JS numbers and are rounded to whole units.

use std::str::FromStr;

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("kedai stock rules loaded"));
}

fn whole_units(value: f64) -> i64 {
    value.round() as i64
}

/// Stock status label (`out`, `critical`, `warning`, `safe`)
#[wasm_bindgen]
pub fn classify_stock_level(quantity: f64, low_stock_threshold: Option<f64>) -> String {
    classify_stock(whole_units(quantity), low_stock_threshold.map(whole_units))
        .as_str()
        .to_string()
}

/// Whether the dashboard should badge this product
#[wasm_bindgen]
pub fn is_low_stock(quantity: f64, low_stock_threshold: Option<f64>) -> bool {
    classify_stock(whole_units(quantity), low_stock_threshold.map(whole_units)).is_alert()
}

/// Alert text for a product, or `undefined` when its stock is safe
#[wasm_bindgen]
pub fn low_stock_alert_message(
    product_name: &str,
    quantity: f64,
    low_stock_threshold: Option<f64>,
) -> Option<String> {
    let status = classify_stock(whole_units(quantity), low_stock_threshold.map(whole_units));
    low_stock_message(product_name, status)
}

/// Every status label, most severe first, for chart legends
#[wasm_bindgen]
pub fn stock_status_labels() -> js_sys::Array {
    [
        StockStatus::Out,
        StockStatus::Critical,
        StockStatus::Warning,
        StockStatus::Safe,
    ]
    .iter()
    .map(|s| JsValue::from_str(s.as_str()))
    .collect()
}

/// Units consumed for `portions` portions of a recipe line.
/// `quantity_per_portion` is a decimal string such as `"0.25"`; zero or
/// negative lines consume nothing.
#[wasm_bindgen]
pub fn recipe_line_deduction(quantity_per_portion: &str, portions: f64) -> Result<f64, JsValue> {
    let per_portion = Decimal::from_str(quantity_per_portion.trim())
        .map_err(|e| JsValue::from_str(&format!("Invalid quantity per portion: {}", e)))?;
    let units = portion_deduction(per_portion, whole_units(portions))
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(units.unwrap_or(0) as f64)
}

/// Change in product quantity when a purchase moves between states.
/// Pass an empty status for a side that does not exist (create or delete).
#[wasm_bindgen]
pub fn purchase_stock_change(
    old_status: &str,
    old_quantity: f64,
    new_status: &str,
    new_quantity: f64,
) -> Result<f64, JsValue> {
    let old = purchase_effect(old_status, old_quantity)?;
    let new = purchase_effect(new_status, new_quantity)?;
    Ok(purchase_stock_delta(old, new) as f64)
}

fn purchase_effect(status: &str, quantity: f64) -> Result<Option<PurchaseEffect>, JsValue> {
    if status.trim().is_empty() {
        return Ok(None);
    }
    let status = PurchaseStatus::from_str(status).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(Some(PurchaseEffect::new(status, whole_units(quantity))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_matches_backend() {
        for (quantity, threshold) in [(0, Some(10)), (5, Some(10)), (7, Some(10)), (10, Some(10)), (3, None)] {
            assert_eq!(
                classify_stock_level(quantity as f64, threshold.map(|t| t as f64)),
                classify_stock(quantity, threshold).as_str()
            );
        }
    }

    #[test]
    fn test_low_stock_flags() {
        assert!(is_low_stock(0.0, None));
        assert!(is_low_stock(4.0, Some(10.0)));
        assert!(!is_low_stock(12.0, Some(10.0)));
        assert_eq!(low_stock_alert_message("Gula", 12.0, Some(10.0)), None);
        assert_eq!(
            low_stock_alert_message("Gula", 0.0, Some(10.0)),
            Some("Stok Gula habis".to_string())
        );
    }

    #[test]
    fn test_recipe_line_deduction() {
        assert_eq!(recipe_line_deduction("0.5", 3.0).ok(), Some(2.0));
        assert_eq!(recipe_line_deduction("0.1", 1.0).ok(), Some(1.0));
        assert_eq!(recipe_line_deduction("0", 4.0).ok(), Some(0.0));
    }

    #[test]
    fn test_purchase_stock_change() {
        assert_eq!(purchase_stock_change("", 0.0, "COMPLETED", 50.0).ok(), Some(50.0));
        assert_eq!(purchase_stock_change("COMPLETED", 50.0, "CANCELLED", 50.0).ok(), Some(-50.0));
        assert_eq!(purchase_stock_change("PENDING", 50.0, "", 0.0).ok(), Some(0.0));
    }
}
