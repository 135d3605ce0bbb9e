//! Read side of the purchase and sales ledgers

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::models::{StockInTransaction, StockOutSource, StockOutTransaction};
use shared::types::{PaginatedResponse, Pagination};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::postgres::{convert_rows, StockInRow, StockOutRow, STOCK_IN_COLUMNS, STOCK_OUT_COLUMNS};
use crate::tenancy::OwnerScope;

/// Ledger filters shared by purchases and sales
#[derive(Debug, Default, Deserialize)]
pub struct LedgerQuery {
    pub product_id: Option<Uuid>,
    /// Inclusive lower bound on transaction date
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on transaction date
    pub to: Option<DateTime<Utc>>,
    /// Sales only
    pub source: Option<StockOutSource>,
    /// Sales only
    pub batch_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl LedgerQuery {
    fn check(&self) -> AppResult<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from >= to {
                return Err(AppError::invalid("from", "Start date must be before end date"));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

impl LedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_purchases(
        &self,
        scope: &OwnerScope,
        query: LedgerQuery,
    ) -> AppResult<PaginatedResponse<StockInTransaction>> {
        query.check()?;
        let pagination = Pagination::normalized(query.page, query.per_page);

        let filter = "owner_id = $1 \
             AND ($2::uuid IS NULL OR product_id = $2) \
             AND ($3::timestamptz IS NULL OR transaction_date >= $3) \
             AND ($4::timestamptz IS NULL OR transaction_date < $4)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM stock_in_transactions WHERE {}",
            filter
        ))
        .bind(scope.owner_id)
        .bind(query.product_id)
        .bind(query.from)
        .bind(query.to)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, StockInRow>(&format!(
            "SELECT {} FROM stock_in_transactions WHERE {} \
             ORDER BY transaction_date DESC, created_at DESC LIMIT $5 OFFSET $6",
            STOCK_IN_COLUMNS, filter
        ))
        .bind(scope.owner_id)
        .bind(query.product_id)
        .bind(query.from)
        .bind(query.to)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            convert_rows(rows)?,
            &pagination,
            total.max(0) as u64,
        ))
    }

    pub async fn list_sales(
        &self,
        scope: &OwnerScope,
        query: LedgerQuery,
    ) -> AppResult<PaginatedResponse<StockOutTransaction>> {
        query.check()?;
        let pagination = Pagination::normalized(query.page, query.per_page);
        let source = query.source.map(|s| s.as_str());

        let filter = "owner_id = $1 \
             AND ($2::uuid IS NULL OR product_id = $2) \
             AND ($3::timestamptz IS NULL OR transaction_date >= $3) \
             AND ($4::timestamptz IS NULL OR transaction_date < $4) \
             AND ($5::text IS NULL OR source = $5) \
             AND ($6::uuid IS NULL OR batch_id = $6)";

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM stock_out_transactions WHERE {}",
            filter
        ))
        .bind(scope.owner_id)
        .bind(query.product_id)
        .bind(query.from)
        .bind(query.to)
        .bind(source)
        .bind(query.batch_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, StockOutRow>(&format!(
            "SELECT {} FROM stock_out_transactions WHERE {} \
             ORDER BY transaction_date DESC, created_at DESC, name LIMIT $7 OFFSET $8",
            STOCK_OUT_COLUMNS, filter
        ))
        .bind(scope.owner_id)
        .bind(query.product_id)
        .bind(query.from)
        .bind(query.to)
        .bind(source)
        .bind(query.batch_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(
            convert_rows(rows)?,
            &pagination,
            total.max(0) as u64,
        ))
    }
}
