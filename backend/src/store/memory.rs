//! In-process stock store
//!
//! Holds all state behind one async mutex. A transaction takes the lock for
//! its whole lifetime and works on a copy that replaces the shared state on
//! commit, which gives the same all-or-nothing and serialized-writer
//! behaviour the Postgres store gets from row locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{
    Menu, MenuRecipe, Notification, Product, RecipeLine, StockInTransaction, StockOutTransaction,
    Supplier,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{StockStore, StockTx};
use crate::error::{AppError, AppResult};
use crate::tenancy::OwnerScope;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    suppliers: HashMap<Uuid, Supplier>,
    menus: HashMap<Uuid, Menu>,
    recipe_lines: Vec<RecipeLine>,
    stock_ins: Vec<StockInTransaction>,
    stock_outs: Vec<StockOutTransaction>,
    notifications: Vec<Notification>,
}

impl MemoryState {
    fn recipe(&self, menu: &Menu) -> MenuRecipe {
        MenuRecipe {
            menu: menu.clone(),
            lines: self
                .recipe_lines
                .iter()
                .filter(|line| line.menu_id == menu.id)
                .cloned()
                .collect(),
        }
    }
}

/// Stock store kept entirely in memory
#[derive(Clone, Default)]
pub struct MemoryStockStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.lock().await.products.insert(product.id, product);
    }

    pub async fn insert_supplier(&self, supplier: Supplier) {
        self.state.lock().await.suppliers.insert(supplier.id, supplier);
    }

    pub async fn insert_menu(&self, menu: Menu, lines: Vec<RecipeLine>) {
        let mut state = self.state.lock().await;
        state.recipe_lines.retain(|line| line.menu_id != menu.id);
        state.recipe_lines.extend(lines);
        state.menus.insert(menu.id, menu);
    }

    pub async fn product(&self, id: Uuid) -> Option<Product> {
        self.state.lock().await.products.get(&id).cloned()
    }

    pub async fn stock_ins(&self) -> Vec<StockInTransaction> {
        self.state.lock().await.stock_ins.clone()
    }

    pub async fn stock_outs(&self) -> Vec<StockOutTransaction> {
        self.state.lock().await.stock_outs.clone()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.notifications.clone()
    }
}

#[async_trait]
impl StockStore for MemoryStockStore {
    async fn begin(&self, _timeout: Duration) -> AppResult<Box<dyn StockTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryStockTx { guard, working }))
    }
}

struct MemoryStockTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn missing(resource: &str) -> AppError {
    AppError::NotFound(resource.to_string())
}

#[async_trait]
impl StockTx for MemoryStockTx {
    async fn lock_products(&mut self, scope: &OwnerScope, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        Ok(ids
            .iter()
            .filter_map(|id| self.working.products.get(id))
            .filter(|p| scope.covers(p.owner_id))
            .cloned()
            .collect())
    }

    async fn scope_products(&mut self, scope: &OwnerScope) -> AppResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .working
            .products
            .values()
            .filter(|p| scope.covers(p.owner_id))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn adjust_quantity(&mut self, product_id: Uuid, delta: i64) -> AppResult<i64> {
        let product = self
            .working
            .products
            .get_mut(&product_id)
            .ok_or_else(|| missing("Product"))?;
        product.quantity = product
            .quantity
            .checked_add(delta)
            .ok_or_else(|| AppError::invalid("quantity", "Quantity is out of range"))?;
        product.updated_at = Utc::now();
        Ok(product.quantity)
    }

    async fn find_supplier(&mut self, scope: &OwnerScope, id: Uuid) -> AppResult<Option<Supplier>> {
        Ok(self
            .working
            .suppliers
            .get(&id)
            .filter(|s| scope.covers(s.owner_id))
            .cloned())
    }

    async fn menu_recipe(&mut self, menu_id: Uuid) -> AppResult<Option<MenuRecipe>> {
        Ok(self
            .working
            .menus
            .get(&menu_id)
            .map(|menu| self.working.recipe(menu)))
    }

    async fn menu_recipes_by_reference(
        &mut self,
        codes: &[String],
        names: &[String],
    ) -> AppResult<Vec<MenuRecipe>> {
        let normalize = |values: &[String]| -> Vec<String> {
            values.iter().map(|v| v.trim().to_lowercase()).collect()
        };
        let (codes, names) = (normalize(codes), normalize(names));
        Ok(self
            .working
            .menus
            .values()
            .filter(|menu| {
                codes.contains(&menu.code.trim().to_lowercase())
                    || names.contains(&menu.name.trim().to_lowercase())
            })
            .map(|menu| self.working.recipe(menu))
            .collect())
    }

    async fn insert_stock_in(&mut self, row: &StockInTransaction) -> AppResult<()> {
        self.working.stock_ins.push(row.clone());
        Ok(())
    }

    async fn lock_stock_in(&mut self, owner_id: Uuid, id: Uuid) -> AppResult<Option<StockInTransaction>> {
        Ok(self
            .working
            .stock_ins
            .iter()
            .find(|row| row.id == id && row.owner_id == owner_id)
            .cloned())
    }

    async fn update_stock_in(&mut self, row: &StockInTransaction) -> AppResult<()> {
        let existing = self
            .working
            .stock_ins
            .iter_mut()
            .find(|r| r.id == row.id)
            .ok_or_else(|| missing("Purchase"))?;
        *existing = row.clone();
        Ok(())
    }

    async fn delete_stock_in(&mut self, id: Uuid) -> AppResult<()> {
        self.working.stock_ins.retain(|row| row.id != id);
        Ok(())
    }

    async fn insert_stock_outs(&mut self, rows: &[StockOutTransaction]) -> AppResult<()> {
        self.working.stock_outs.extend_from_slice(rows);
        Ok(())
    }

    async fn lock_stock_out(&mut self, owner_id: Uuid, id: Uuid) -> AppResult<Option<StockOutTransaction>> {
        Ok(self
            .working
            .stock_outs
            .iter()
            .find(|row| row.id == id && row.owner_id == owner_id)
            .cloned())
    }

    async fn update_stock_out(&mut self, row: &StockOutTransaction) -> AppResult<()> {
        let existing = self
            .working
            .stock_outs
            .iter_mut()
            .find(|r| r.id == row.id)
            .ok_or_else(|| missing("Sale"))?;
        *existing = row.clone();
        Ok(())
    }

    async fn delete_stock_out(&mut self, id: Uuid) -> AppResult<()> {
        self.working.stock_outs.retain(|row| row.id != id);
        Ok(())
    }

    async fn unresolved_notifications(&mut self, owner_id: Uuid) -> AppResult<Vec<Notification>> {
        Ok(self
            .working
            .notifications
            .iter()
            .filter(|n| n.owner_id == owner_id && n.resolved_at.is_none())
            .cloned()
            .collect())
    }

    async fn insert_notification(&mut self, notification: &Notification) -> AppResult<Notification> {
        let open = self.working.notifications.iter().find(|n| {
            n.resolved_at.is_none()
                && n.owner_id == notification.owner_id
                && n.product_id == notification.product_id
                && n.status == notification.status
        });
        if let Some(existing) = open {
            return Ok(existing.clone());
        }
        self.working.notifications.push(notification.clone());
        Ok(notification.clone())
    }

    async fn update_notification_message(&mut self, id: Uuid, message: &str) -> AppResult<()> {
        let notification = self
            .working
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| missing("Notification"))?;
        notification.message = message.to_string();
        Ok(())
    }

    async fn resolve_notification(&mut self, id: Uuid, resolved_at: DateTime<Utc>) -> AppResult<()> {
        let notification = self
            .working
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| missing("Notification"))?;
        notification.resolved_at = Some(resolved_at);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryStockTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
