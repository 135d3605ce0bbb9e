//! Transactional persistence for stock mutations
//!
//! Every engine operation opens one [`StockTx`] through [`StockStore::begin`],
//! does all of its reads and writes through it, and commits. Dropping a
//! transaction without committing discards every write made through it.
//!
//! Product rows returned by [`StockTx::lock_products`] stay locked until the
//! transaction ends, so the stock guard and the quantity update cannot race
//! with another writer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{
    MenuRecipe, Notification, Product, StockInTransaction, StockOutTransaction, Supplier,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::tenancy::OwnerScope;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStockStore;
pub use postgres::PgStockStore;

/// Source of stock transactions
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Start a unit of work. `timeout` bounds each statement run inside it.
    async fn begin(&self, timeout: Duration) -> AppResult<Box<dyn StockTx>>;
}

/// One open unit of work
#[async_trait]
pub trait StockTx: Send {
    // Products

    /// Lock and return the products among `ids` that belong to the scope.
    /// Rows are locked in id order; missing ids are simply absent.
    async fn lock_products(&mut self, scope: &OwnerScope, ids: &[Uuid]) -> AppResult<Vec<Product>>;

    /// Every product in the scope, ordered by name
    async fn scope_products(&mut self, scope: &OwnerScope) -> AppResult<Vec<Product>>;

    /// Apply `quantity = quantity + delta` and return the new quantity
    async fn adjust_quantity(&mut self, product_id: Uuid, delta: i64) -> AppResult<i64>;

    async fn find_supplier(&mut self, scope: &OwnerScope, id: Uuid) -> AppResult<Option<Supplier>>;

    // Menus

    async fn menu_recipe(&mut self, menu_id: Uuid) -> AppResult<Option<MenuRecipe>>;

    /// Menus whose code is in `codes` or whose name is in `names`, ignoring case
    async fn menu_recipes_by_reference(
        &mut self,
        codes: &[String],
        names: &[String],
    ) -> AppResult<Vec<MenuRecipe>>;

    // Purchases

    async fn insert_stock_in(&mut self, row: &StockInTransaction) -> AppResult<()>;

    async fn lock_stock_in(&mut self, owner_id: Uuid, id: Uuid) -> AppResult<Option<StockInTransaction>>;

    async fn update_stock_in(&mut self, row: &StockInTransaction) -> AppResult<()>;

    async fn delete_stock_in(&mut self, id: Uuid) -> AppResult<()>;

    // Sales

    async fn insert_stock_outs(&mut self, rows: &[StockOutTransaction]) -> AppResult<()>;

    async fn lock_stock_out(&mut self, owner_id: Uuid, id: Uuid) -> AppResult<Option<StockOutTransaction>>;

    async fn update_stock_out(&mut self, row: &StockOutTransaction) -> AppResult<()>;

    async fn delete_stock_out(&mut self, id: Uuid) -> AppResult<()>;

    // Notifications

    async fn unresolved_notifications(&mut self, owner_id: Uuid) -> AppResult<Vec<Notification>>;

    /// Returns the stored open row. When an unresolved row for the same
    /// owner, product and status already exists, that row is returned
    /// unchanged instead.
    async fn insert_notification(&mut self, notification: &Notification) -> AppResult<Notification>;

    async fn update_notification_message(&mut self, id: Uuid, message: &str) -> AppResult<()>;

    async fn resolve_notification(&mut self, id: Uuid, resolved_at: DateTime<Utc>) -> AppResult<()>;

    /// Make every write durable
    async fn commit(self: Box<Self>) -> AppResult<()>;
}
