//! Dashboard aggregates
//!
//! Stock status counts use the same classification as notifications and
//! the WASM module, so the dashboard and the alert list always agree.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{Product, StockStatus};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::store::postgres::{convert_rows, ProductRow, PRODUCT_COLUMNS};
use crate::tenancy::OwnerScope;

const DEFAULT_WINDOW_DAYS: i64 = 30;
const MAX_WINDOW_DAYS: i64 = 365;
const TOP_PRODUCTS: i64 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Length of the reporting window ending now
    pub days: Option<i64>,
}

#[derive(Debug, Default, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub out: u64,
    pub critical: u64,
    pub warning: u64,
    pub safe: u64,
}

impl StatusCounts {
    pub fn from_products(products: &[Product]) -> Self {
        let mut counts = Self::default();
        for product in products {
            match product.stock_status() {
                StockStatus::Out => counts.out += 1,
                StockStatus::Critical => counts.critical += 1,
                StockStatus::Warning => counts.warning += 1,
                StockStatus::Safe => counts.safe += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct DailyStockOut {
    pub day: NaiveDate,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub product_count: u64,
    /// Sum of price times quantity over the catalog
    pub stock_value: i64,
    pub status_counts: StatusCounts,
    /// Completed purchases in the window
    pub purchase_total_amount: i64,
    pub pending_purchases: i64,
    pub stock_out_quantity: i64,
    pub top_products: Vec<TopProduct>,
    pub daily_stock_out: Vec<DailyStockOut>,
}

/// Catalog value, saturating instead of overflowing
pub fn stock_value(products: &[Product]) -> i64 {
    products.iter().fold(0i64, |acc, p| {
        acc.saturating_add(p.price.saturating_mul(p.quantity.max(0)))
    })
}

fn window_days(query: &DashboardQuery) -> i64 {
    query
        .days
        .unwrap_or(DEFAULT_WINDOW_DAYS)
        .clamp(1, MAX_WINDOW_DAYS)
}

#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn summary(
        &self,
        scope: &OwnerScope,
        query: DashboardQuery,
    ) -> AppResult<DashboardSummary> {
        let window_end = Utc::now();
        let window_start = window_end - Duration::days(window_days(&query));

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE owner_id = ANY($1)",
            PRODUCT_COLUMNS
        ))
        .bind(scope.owner_ids())
        .fetch_all(&self.db)
        .await?;
        let products: Vec<Product> = convert_rows(rows)?;

        let (purchase_total_amount, pending_purchases): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(total_amount) FILTER (WHERE status = 'COMPLETED'), 0)::BIGINT,
                COUNT(*) FILTER (WHERE status = 'PENDING')
            FROM stock_in_transactions
            WHERE owner_id = $1 AND transaction_date >= $2 AND transaction_date < $3
            "#,
        )
        .bind(scope.owner_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_one(&self.db)
        .await?;

        let stock_out_quantity: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM stock_out_transactions
            WHERE owner_id = $1 AND transaction_date >= $2 AND transaction_date < $3
            "#,
        )
        .bind(scope.owner_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_one(&self.db)
        .await?;

        let top_products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT p.id AS product_id, p.name, SUM(s.quantity)::BIGINT AS quantity
            FROM stock_out_transactions s
            JOIN products p ON p.id = s.product_id
            WHERE s.owner_id = $1 AND s.transaction_date >= $2 AND s.transaction_date < $3
            GROUP BY p.id, p.name
            ORDER BY quantity DESC, p.name
            LIMIT $4
            "#,
        )
        .bind(scope.owner_id)
        .bind(window_start)
        .bind(window_end)
        .bind(TOP_PRODUCTS)
        .fetch_all(&self.db)
        .await?;

        let daily_stock_out = sqlx::query_as::<_, DailyStockOut>(
            r#"
            SELECT (transaction_date AT TIME ZONE 'UTC')::DATE AS day,
                   SUM(quantity)::BIGINT AS quantity
            FROM stock_out_transactions
            WHERE owner_id = $1 AND transaction_date >= $2 AND transaction_date < $3
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(scope.owner_id)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&self.db)
        .await?;

        Ok(DashboardSummary {
            window_start,
            window_end,
            product_count: products.len() as u64,
            stock_value: stock_value(&products),
            status_counts: StatusCounts::from_products(&products),
            purchase_total_amount,
            pending_purchases,
            stock_out_quantity,
            top_products,
            daily_stock_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::StockUnit;

    fn product(quantity: i64, threshold: Option<i64>, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: "Bahan".to_string(),
            category: "Bahan".to_string(),
            unit: StockUnit::Pcs,
            price,
            quantity,
            low_stock_threshold: threshold,
            supplier_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_status_counts() {
        let products = vec![
            product(0, Some(10), 1),
            product(5, Some(10), 1),
            product(7, Some(10), 1),
            product(10, Some(10), 1),
            product(3, None, 1),
        ];
        let counts = StatusCounts::from_products(&products);
        assert_eq!(
            counts,
            StatusCounts {
                out: 1,
                critical: 1,
                warning: 1,
                safe: 2
            }
        );
    }

    #[test]
    fn test_stock_value_saturates() {
        assert_eq!(stock_value(&[product(3, None, 1500), product(2, None, 250)]), 5000);
        assert_eq!(stock_value(&[product(i64::MAX, None, 2)]), i64::MAX);
    }

    #[test]
    fn test_window_is_clamped() {
        assert_eq!(window_days(&DashboardQuery { days: None }), 30);
        assert_eq!(window_days(&DashboardQuery { days: Some(0) }), 1);
        assert_eq!(window_days(&DashboardQuery { days: Some(9999) }), 365);
    }
}
