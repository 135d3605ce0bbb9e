//! Menu and recipe (bill of materials) models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::QuantityOverflow;

/// A sellable menu item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Menu {
    pub id: Uuid,
    /// Human entered, unique code printed on the cashier's sheet
    pub code: String,
    pub name: String,
    pub price: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ingredient line of a menu's recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeLine {
    pub menu_id: Uuid,
    pub product_id: Uuid,
    pub quantity_per_portion: Decimal,
}

/// A menu together with its recipe lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MenuRecipe {
    pub menu: Menu,
    pub lines: Vec<RecipeLine>,
}

/// Units of an ingredient consumed by selling `portions` portions.
///
/// Lines with a non-positive per-portion quantity consume nothing and
/// return `Ok(None)`. Otherwise the product is rounded half away from zero
/// and at least one unit is consumed.
pub fn portion_deduction(
    quantity_per_portion: Decimal,
    portions: i64,
) -> Result<Option<i64>, QuantityOverflow> {
    if quantity_per_portion <= Decimal::ZERO || portions <= 0 {
        return Ok(None);
    }
    let raw = quantity_per_portion
        .checked_mul(Decimal::from(portions))
        .ok_or(QuantityOverflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let units = i64::try_from(raw).map_err(|_| QuantityOverflow)?;
    Ok(Some(units.max(1)))
}

/// One ingredient deduction produced by expanding a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientDeduction {
    pub product_id: Uuid,
    pub quantity: i64,
}

impl MenuRecipe {
    /// Expand the recipe for a number of portions, skipping zero lines
    pub fn deductions(&self, portions: i64) -> Result<Vec<IngredientDeduction>, QuantityOverflow> {
        let mut out = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if let Some(quantity) = portion_deduction(line.quantity_per_portion, portions)? {
                out.push(IngredientDeduction {
                    product_id: line.product_id,
                    quantity,
                });
            }
        }
        Ok(out)
    }
}

/// Add one deduction to the running per-product totals
pub fn add_deduction(
    totals: &mut BTreeMap<Uuid, i64>,
    deduction: &IngredientDeduction,
) -> Result<(), QuantityOverflow> {
    let total = totals.entry(deduction.product_id).or_insert(0);
    *total = total.checked_add(deduction.quantity).ok_or(QuantityOverflow)?;
    Ok(())
}

/// Sum deductions per product. Ordered by product id so that callers lock
/// rows in a stable order.
pub fn aggregate_deductions<'a>(
    deductions: impl IntoIterator<Item = &'a IngredientDeduction>,
) -> Result<BTreeMap<Uuid, i64>, QuantityOverflow> {
    let mut totals = BTreeMap::new();
    for d in deductions {
        add_deduction(&mut totals, d)?;
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_whole_portions() {
        assert_eq!(portion_deduction(dec("2"), 3), Ok(Some(6)));
        assert_eq!(portion_deduction(dec("15"), 1), Ok(Some(15)));
    }

    #[test]
    fn test_fractional_recipe_rounds_half_up() {
        assert_eq!(portion_deduction(dec("0.5"), 3), Ok(Some(2)));
        assert_eq!(portion_deduction(dec("0.25"), 2), Ok(Some(1)));
        assert_eq!(portion_deduction(dec("2.5"), 1), Ok(Some(3)));
    }

    #[test]
    fn test_tiny_recipe_consumes_at_least_one_unit() {
        assert_eq!(portion_deduction(dec("0.1"), 1), Ok(Some(1)));
        assert_eq!(portion_deduction(dec("0.01"), 4), Ok(Some(1)));
    }

    #[test]
    fn test_non_positive_lines_are_skipped() {
        assert_eq!(portion_deduction(Decimal::ZERO, 5), Ok(None));
        assert_eq!(portion_deduction(dec("-1"), 5), Ok(None));
    }

    #[test]
    fn test_oversized_deduction_overflows() {
        assert_eq!(portion_deduction(dec("10"), i64::MAX), Err(QuantityOverflow));
        assert_eq!(portion_deduction(Decimal::MAX, 2), Err(QuantityOverflow));
    }

    #[test]
    fn test_aggregation_sums_per_product() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let deductions = [
            IngredientDeduction { product_id: x, quantity: 4 },
            IngredientDeduction { product_id: y, quantity: 1 },
            IngredientDeduction { product_id: x, quantity: 6 },
        ];
        let totals = aggregate_deductions(&deductions).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&x], 10);
        assert_eq!(totals[&y], 1);
    }

    #[test]
    fn test_aggregation_overflow_is_reported() {
        let x = Uuid::new_v4();
        let huge = IngredientDeduction { product_id: x, quantity: 5_000_000_000_000_000_000 };
        assert_eq!(aggregate_deductions([&huge, &huge]), Err(QuantityOverflow));
    }
}
