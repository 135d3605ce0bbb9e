//! PostgreSQL stock store
//!
//! Enum columns are stored as TEXT and converted through the shared
//! `as_str` / `FromStr` pairs, so the row types below are the only place
//! that knows the column layout.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{
    Menu, MenuRecipe, Notification, Product, RecipeLine, StockInTransaction, StockOutTransaction,
    Supplier,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{StockStore, StockTx};
use crate::error::{AppError, AppResult};
use crate::tenancy::OwnerScope;

pub(crate) const PRODUCT_COLUMNS: &str = "id, owner_id, name, category, unit, price, quantity, \
     low_stock_threshold, supplier_id, created_at, updated_at";

pub(crate) const SUPPLIER_COLUMNS: &str =
    "id, owner_id, name, phone, address, created_at, updated_at";

pub(crate) const MENU_COLUMNS: &str = "id, code, name, price, created_at, updated_at";

pub(crate) const STOCK_IN_COLUMNS: &str = "id, owner_id, product_id, supplier_id, name, quantity, \
     total_amount, status, payment_method, transaction_date, created_at, updated_at";

pub(crate) const STOCK_OUT_COLUMNS: &str = "id, owner_id, product_id, menu_id, name, quantity, \
     transaction_date, note, source, batch_id, created_at, updated_at";

const NOTIFICATION_COLUMNS: &str =
    "id, owner_id, product_id, status, message, severity, notified_at, resolved_at";

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    category: String,
    unit: String,
    price: i64,
    quantity: i64,
    low_stock_threshold: Option<i64>,
    supplier_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> AppResult<Self> {
        Ok(Product {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            category: row.category,
            unit: row.unit.parse()?,
            price: row.price,
            quantity: row.quantity,
            low_stock_threshold: row.low_stock_threshold,
            supplier_id: row.supplier_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SupplierRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct MenuRow {
    id: Uuid,
    code: String,
    name: String,
    price: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MenuRow> for Menu {
    fn from(row: MenuRow) -> Self {
        Menu {
            id: row.id,
            code: row.code,
            name: row.name,
            price: row.price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RecipeLineRow {
    menu_id: Uuid,
    product_id: Uuid,
    quantity_per_portion: Decimal,
}

impl From<RecipeLineRow> for RecipeLine {
    fn from(row: RecipeLineRow) -> Self {
        RecipeLine {
            menu_id: row.menu_id,
            product_id: row.product_id,
            quantity_per_portion: row.quantity_per_portion,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct StockInRow {
    id: Uuid,
    owner_id: Uuid,
    product_id: Uuid,
    supplier_id: Option<Uuid>,
    name: String,
    quantity: i64,
    total_amount: i64,
    status: String,
    payment_method: String,
    transaction_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StockInRow> for StockInTransaction {
    type Error = AppError;

    fn try_from(row: StockInRow) -> AppResult<Self> {
        Ok(StockInTransaction {
            id: row.id,
            owner_id: row.owner_id,
            product_id: row.product_id,
            supplier_id: row.supplier_id,
            name: row.name,
            quantity: row.quantity,
            total_amount: row.total_amount,
            status: row.status.parse()?,
            payment_method: row.payment_method,
            transaction_date: row.transaction_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct StockOutRow {
    id: Uuid,
    owner_id: Uuid,
    product_id: Uuid,
    menu_id: Option<Uuid>,
    name: String,
    quantity: i64,
    transaction_date: DateTime<Utc>,
    note: Option<String>,
    source: String,
    batch_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StockOutRow> for StockOutTransaction {
    type Error = AppError;

    fn try_from(row: StockOutRow) -> AppResult<Self> {
        Ok(StockOutTransaction {
            id: row.id,
            owner_id: row.owner_id,
            product_id: row.product_id,
            menu_id: row.menu_id,
            name: row.name,
            quantity: row.quantity,
            transaction_date: row.transaction_date,
            note: row.note,
            source: row.source.parse()?,
            batch_id: row.batch_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    owner_id: Uuid,
    product_id: Uuid,
    status: String,
    message: String,
    severity: String,
    notified_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> AppResult<Self> {
        Ok(Notification {
            id: row.id,
            owner_id: row.owner_id,
            product_id: row.product_id,
            status: row.status.parse()?,
            message: row.message,
            severity: row.severity.parse()?,
            notified_at: row.notified_at,
            resolved_at: row.resolved_at,
        })
    }
}

/// Convert a batch of fallible rows
pub(crate) fn convert_rows<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// Store
// ============================================================================

/// Stock store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStockStore {
    db: PgPool,
}

impl PgStockStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn begin(&self, timeout: Duration) -> AppResult<Box<dyn StockTx>> {
        let mut tx = self.db.begin().await?;
        // SET takes no bind parameters
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;
        Ok(Box::new(PgStockTx { tx }))
    }
}

struct PgStockTx {
    tx: Transaction<'static, Postgres>,
}

impl PgStockTx {
    async fn recipes_for(&mut self, menus: Vec<MenuRow>) -> AppResult<Vec<MenuRecipe>> {
        let menu_ids: Vec<Uuid> = menus.iter().map(|m| m.id).collect();
        let lines = sqlx::query_as::<_, RecipeLineRow>(
            "SELECT menu_id, product_id, quantity_per_portion FROM recipe_lines \
             WHERE menu_id = ANY($1) ORDER BY menu_id, product_id",
        )
        .bind(&menu_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let lines: Vec<RecipeLine> = lines.into_iter().map(RecipeLine::from).collect();
        Ok(menus
            .into_iter()
            .map(|row| {
                let menu = Menu::from(row);
                let lines = lines
                    .iter()
                    .filter(|line| line.menu_id == menu.id)
                    .cloned()
                    .collect();
                MenuRecipe { menu, lines }
            })
            .collect())
    }
}

#[async_trait]
impl StockTx for PgStockTx {
    async fn lock_products(&mut self, scope: &OwnerScope, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = ANY($1) AND owner_id = ANY($2) \
             ORDER BY id FOR UPDATE",
            PRODUCT_COLUMNS
        ))
        .bind(ids)
        .bind(scope.owner_ids())
        .fetch_all(&mut *self.tx)
        .await?;

        convert_rows(rows)
    }

    async fn scope_products(&mut self, scope: &OwnerScope) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE owner_id = ANY($1) ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .bind(scope.owner_ids())
        .fetch_all(&mut *self.tx)
        .await?;

        convert_rows(rows)
    }

    async fn adjust_quantity(&mut self, product_id: Uuid, delta: i64) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE products SET quantity = quantity + $2, updated_at = NOW() \
             WHERE id = $1 RETURNING quantity",
        )
        .bind(product_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    async fn find_supplier(&mut self, scope: &OwnerScope, id: Uuid) -> AppResult<Option<Supplier>> {
        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers WHERE id = $1 AND owner_id = ANY($2)",
            SUPPLIER_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner_ids())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Supplier::from))
    }

    async fn menu_recipe(&mut self, menu_id: Uuid) -> AppResult<Option<MenuRecipe>> {
        let row = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus WHERE id = $1",
            MENU_COLUMNS
        ))
        .bind(menu_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => Ok(self.recipes_for(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn menu_recipes_by_reference(
        &mut self,
        codes: &[String],
        names: &[String],
    ) -> AppResult<Vec<MenuRecipe>> {
        let normalize = |values: &[String]| -> Vec<String> {
            values.iter().map(|v| v.trim().to_lowercase()).collect()
        };
        let rows = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus \
             WHERE LOWER(TRIM(code)) = ANY($1) OR LOWER(TRIM(name)) = ANY($2)",
            MENU_COLUMNS
        ))
        .bind(normalize(codes))
        .bind(normalize(names))
        .fetch_all(&mut *self.tx)
        .await?;

        self.recipes_for(rows).await
    }

    async fn insert_stock_in(&mut self, row: &StockInTransaction) -> AppResult<()> {
        sqlx::query(&format!(
            "INSERT INTO stock_in_transactions ({}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            STOCK_IN_COLUMNS
        ))
        .bind(row.id)
        .bind(row.owner_id)
        .bind(row.product_id)
        .bind(row.supplier_id)
        .bind(&row.name)
        .bind(row.quantity)
        .bind(row.total_amount)
        .bind(row.status.as_str())
        .bind(&row.payment_method)
        .bind(row.transaction_date)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_stock_in(&mut self, owner_id: Uuid, id: Uuid) -> AppResult<Option<StockInTransaction>> {
        let row = sqlx::query_as::<_, StockInRow>(&format!(
            "SELECT {} FROM stock_in_transactions WHERE id = $1 AND owner_id = $2 FOR UPDATE",
            STOCK_IN_COLUMNS
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(StockInTransaction::try_from).transpose()
    }

    async fn update_stock_in(&mut self, row: &StockInTransaction) -> AppResult<()> {
        sqlx::query(
            "UPDATE stock_in_transactions SET product_id = $2, supplier_id = $3, name = $4, \
             quantity = $5, total_amount = $6, status = $7, payment_method = $8, \
             transaction_date = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(row.id)
        .bind(row.product_id)
        .bind(row.supplier_id)
        .bind(&row.name)
        .bind(row.quantity)
        .bind(row.total_amount)
        .bind(row.status.as_str())
        .bind(&row.payment_method)
        .bind(row.transaction_date)
        .bind(row.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_stock_in(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM stock_in_transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_stock_outs(&mut self, rows: &[StockOutTransaction]) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        // Column arrays for a single UNNEST insert
        let mut ids = Vec::with_capacity(rows.len());
        let mut owner_ids = Vec::with_capacity(rows.len());
        let mut product_ids = Vec::with_capacity(rows.len());
        let mut menu_ids: Vec<Option<Uuid>> = Vec::with_capacity(rows.len());
        let mut names = Vec::with_capacity(rows.len());
        let mut quantities = Vec::with_capacity(rows.len());
        let mut dates = Vec::with_capacity(rows.len());
        let mut notes: Vec<Option<String>> = Vec::with_capacity(rows.len());
        let mut sources = Vec::with_capacity(rows.len());
        let mut batch_ids: Vec<Option<Uuid>> = Vec::with_capacity(rows.len());
        let mut created = Vec::with_capacity(rows.len());
        let mut updated = Vec::with_capacity(rows.len());

        for row in rows {
            ids.push(row.id);
            owner_ids.push(row.owner_id);
            product_ids.push(row.product_id);
            menu_ids.push(row.menu_id);
            names.push(row.name.clone());
            quantities.push(row.quantity);
            dates.push(row.transaction_date);
            notes.push(row.note.clone());
            sources.push(row.source.as_str().to_string());
            batch_ids.push(row.batch_id);
            created.push(row.created_at);
            updated.push(row.updated_at);
        }

        sqlx::query(&format!(
            "INSERT INTO stock_out_transactions ({}) \
             SELECT * FROM UNNEST($1::uuid[], $2::uuid[], $3::uuid[], $4::uuid[], $5::text[], \
             $6::bigint[], $7::timestamptz[], $8::text[], $9::text[], $10::uuid[], \
             $11::timestamptz[], $12::timestamptz[])",
            STOCK_OUT_COLUMNS
        ))
        .bind(ids)
        .bind(owner_ids)
        .bind(product_ids)
        .bind(menu_ids)
        .bind(names)
        .bind(quantities)
        .bind(dates)
        .bind(notes)
        .bind(sources)
        .bind(batch_ids)
        .bind(created)
        .bind(updated)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn lock_stock_out(&mut self, owner_id: Uuid, id: Uuid) -> AppResult<Option<StockOutTransaction>> {
        let row = sqlx::query_as::<_, StockOutRow>(&format!(
            "SELECT {} FROM stock_out_transactions WHERE id = $1 AND owner_id = $2 FOR UPDATE",
            STOCK_OUT_COLUMNS
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(StockOutTransaction::try_from).transpose()
    }

    async fn update_stock_out(&mut self, row: &StockOutTransaction) -> AppResult<()> {
        sqlx::query(
            "UPDATE stock_out_transactions SET product_id = $2, menu_id = $3, name = $4, \
             quantity = $5, transaction_date = $6, note = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(row.id)
        .bind(row.product_id)
        .bind(row.menu_id)
        .bind(&row.name)
        .bind(row.quantity)
        .bind(row.transaction_date)
        .bind(&row.note)
        .bind(row.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_stock_out(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM stock_out_transactions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn unresolved_notifications(&mut self, owner_id: Uuid) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {} FROM notifications WHERE owner_id = $1 AND resolved_at IS NULL \
             ORDER BY notified_at DESC FOR UPDATE",
            NOTIFICATION_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&mut *self.tx)
        .await?;

        convert_rows(rows)
    }

    async fn insert_notification(&mut self, notification: &Notification) -> AppResult<Notification> {
        let inserted = sqlx::query_as::<_, NotificationRow>(&format!(
            "INSERT INTO notifications ({0}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (owner_id, product_id, status) WHERE resolved_at IS NULL DO NOTHING \
             RETURNING {0}",
            NOTIFICATION_COLUMNS
        ))
        .bind(notification.id)
        .bind(notification.owner_id)
        .bind(notification.product_id)
        .bind(notification.status.as_str())
        .bind(&notification.message)
        .bind(notification.severity.as_str())
        .bind(notification.notified_at)
        .bind(notification.resolved_at)
        .fetch_optional(&mut *self.tx)
        .await?;

        // A concurrent reader stored the open row first
        let row = match inserted {
            Some(row) => row,
            None => {
                sqlx::query_as::<_, NotificationRow>(&format!(
                    "SELECT {} FROM notifications \
                     WHERE owner_id = $1 AND product_id = $2 AND status = $3 AND resolved_at IS NULL",
                    NOTIFICATION_COLUMNS
                ))
                .bind(notification.owner_id)
                .bind(notification.product_id)
                .bind(notification.status.as_str())
                .fetch_one(&mut *self.tx)
                .await?
            }
        };
        row.try_into()
    }

    async fn update_notification_message(&mut self, id: Uuid, message: &str) -> AppResult<()> {
        sqlx::query("UPDATE notifications SET message = $2 WHERE id = $1")
            .bind(id)
            .bind(message)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn resolve_notification(&mut self, id: Uuid, resolved_at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE notifications SET resolved_at = $2 WHERE id = $1")
            .bind(id)
            .bind(resolved_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
