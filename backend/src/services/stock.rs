//! Stock adjustment engine
//!
//! Every operation that changes a product quantity goes through here. Each
//! call resolves the caller's owner scope, opens one unit of work, locks the
//! affected products, checks that no quantity would drop below zero, applies
//! the changes together with the ledger rows and commits. Any error or a
//! timeout drops the unit, which discards all of its writes.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::models::{
    add_deduction, aggregate_deductions, join_notes, purchase_stock_delta, IngredientDeduction,
    Menu, MenuRecipe, Product, PurchaseStatus, StockInTransaction, StockOutSource, StockOutTransaction,
};
use shared::types::QuantityOverflow;
use shared::validation::{
    validate_amount, validate_label, validate_purchase_quantity, validate_sale_quantity,
};
use uuid::Uuid;

use crate::config::StockConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::sales_csv::{parse_sales_csv, MatchBy, SalesCsvRow};
use crate::store::{StockStore, StockTx};
use crate::tenancy::{OwnerScope, TenancyResolver};

// ============================================================================
// Inputs and outcomes
// ============================================================================

/// Fields of a purchase, used for both create and full update
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseInput {
    pub product_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub name: String,
    pub quantity: i64,
    pub total_amount: i64,
    pub payment_method: String,
    pub status: PurchaseStatus,
    /// Defaults to the time of the request
    pub transaction_date: Option<DateTime<Utc>>,
}

impl PurchaseInput {
    fn check(&self) -> AppResult<()> {
        validate_label(&self.name).map_err(|m| AppError::invalid("name", m))?;
        validate_purchase_quantity(self.quantity).map_err(|m| AppError::invalid("quantity", m))?;
        validate_amount(self.total_amount).map_err(|m| AppError::invalid("total_amount", m))?;
        validate_label(&self.payment_method)
            .map_err(|m| AppError::invalid("payment_method", m))?;
        Ok(())
    }
}

/// Fields of a manually entered stock-out
#[derive(Debug, Clone, Deserialize)]
pub struct ManualSaleInput {
    pub product_id: Uuid,
    pub menu_id: Option<Uuid>,
    pub name: String,
    pub quantity: i64,
    pub transaction_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl ManualSaleInput {
    fn check(&self) -> AppResult<()> {
        validate_label(&self.name).map_err(|m| AppError::invalid("name", m))?;
        validate_sale_quantity(self.quantity).map_err(|m| AppError::invalid("quantity", m))?;
        Ok(())
    }
}

/// Sale of whole menu portions, deducted through the menu's recipe
#[derive(Debug, Clone, Deserialize)]
pub struct MenuSaleInput {
    pub menu_id: Uuid,
    pub portions: i64,
    pub transaction_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Ledger rows written by one recipe-driven sale
#[derive(Debug, Clone, Serialize)]
pub struct MenuSaleOutcome {
    pub batch_id: Uuid,
    pub rows: Vec<StockOutTransaction>,
}

/// Result of a CSV sales import
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CsvImportOutcome {
    pub created_count: usize,
    pub batch_id: Uuid,
}

// ============================================================================
// Engine
// ============================================================================

/// Applies purchases and sales to product quantities
pub struct StockAdjustmentEngine {
    store: Arc<dyn StockStore>,
    tenancy: Arc<dyn TenancyResolver>,
    unit_timeout: Duration,
    csv_timeout: Duration,
}

impl StockAdjustmentEngine {
    pub fn new(
        store: Arc<dyn StockStore>,
        tenancy: Arc<dyn TenancyResolver>,
        config: &StockConfig,
    ) -> Self {
        Self {
            store,
            tenancy,
            unit_timeout: config.default_timeout(),
            csv_timeout: config.csv_timeout(),
        }
    }

    /// Owner scope the user acts in
    pub fn scope_for(&self, user: &AuthUser) -> AppResult<OwnerScope> {
        self.tenancy.resolve(user)
    }

    async fn begin(&self, timeout: Duration) -> AppResult<Box<dyn StockTx>> {
        self.store.begin(timeout).await
    }

    /// Run a unit of work under a deadline. The unit's transaction lives
    /// inside `work`, so an expired deadline drops and rolls it back.
    async fn within<T, F>(&self, limit: Duration, operation: &str, work: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, limit_ms = limit.as_millis() as u64, "stock operation timed out");
                Err(AppError::Timeout(operation.to_string()))
            }
        }
    }

    // ------------------------------------------------------------------------
    // Purchases
    // ------------------------------------------------------------------------

    /// Record a purchase; only a COMPLETED purchase adds stock
    #[tracing::instrument(name = "stock.record_purchase", skip_all, fields(user_id = %user.user_id, product_id = %input.product_id))]
    pub async fn record_purchase(
        &self,
        user: &AuthUser,
        input: PurchaseInput,
    ) -> AppResult<StockInTransaction> {
        let scope = self.scope_for(user)?;
        input.check()?;

        self.within(self.unit_timeout, "Recording purchase", async {
            let mut tx = self.begin(self.unit_timeout).await?;
            ensure_supplier(tx.as_mut(), &scope, input.supplier_id).await?;

            let now = Utc::now();
            let row = StockInTransaction {
                id: Uuid::new_v4(),
                owner_id: scope.owner_id,
                product_id: input.product_id,
                supplier_id: input.supplier_id,
                name: input.name.trim().to_string(),
                quantity: input.quantity,
                total_amount: input.total_amount,
                status: input.status,
                payment_method: input.payment_method.trim().to_string(),
                transaction_date: input.transaction_date.unwrap_or(now),
                created_at: now,
                updated_at: now,
            };

            let delta = purchase_stock_delta(None, Some(row.effect()));
            apply_deltas(tx.as_mut(), &scope, &BTreeMap::from([(row.product_id, delta)])).await?;
            tx.insert_stock_in(&row).await?;
            tx.commit().await?;

            tracing::info!(purchase_id = %row.id, status = %row.status, delta, "purchase recorded");
            Ok(row)
        })
        .await
    }

    /// Replace a purchase's fields, moving its stock effect accordingly
    #[tracing::instrument(name = "stock.update_purchase", skip_all, fields(user_id = %user.user_id, purchase_id = %purchase_id))]
    pub async fn update_purchase(
        &self,
        user: &AuthUser,
        purchase_id: Uuid,
        input: PurchaseInput,
    ) -> AppResult<StockInTransaction> {
        let scope = self.scope_for(user)?;
        input.check()?;

        self.within(self.unit_timeout, "Updating purchase", async {
            let mut tx = self.begin(self.unit_timeout).await?;
            let old = tx
                .lock_stock_in(scope.owner_id, purchase_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;
            ensure_supplier(tx.as_mut(), &scope, input.supplier_id).await?;

            let updated = StockInTransaction {
                product_id: input.product_id,
                supplier_id: input.supplier_id,
                name: input.name.trim().to_string(),
                quantity: input.quantity,
                total_amount: input.total_amount,
                status: input.status,
                payment_method: input.payment_method.trim().to_string(),
                transaction_date: input.transaction_date.unwrap_or(old.transaction_date),
                updated_at: Utc::now(),
                ..old.clone()
            };

            let deltas = if old.product_id == updated.product_id {
                BTreeMap::from([(
                    old.product_id,
                    purchase_stock_delta(Some(old.effect()), Some(updated.effect())),
                )])
            } else {
                BTreeMap::from([
                    (old.product_id, purchase_stock_delta(Some(old.effect()), None)),
                    (updated.product_id, purchase_stock_delta(None, Some(updated.effect()))),
                ])
            };

            apply_deltas(tx.as_mut(), &scope, &deltas).await?;
            tx.update_stock_in(&updated).await?;
            tx.commit().await?;

            tracing::info!(from = %old.status, to = %updated.status, "purchase updated");
            Ok(updated)
        })
        .await
    }

    /// Delete a purchase, taking back its stock if it was COMPLETED
    #[tracing::instrument(name = "stock.delete_purchase", skip_all, fields(user_id = %user.user_id, purchase_id = %purchase_id))]
    pub async fn delete_purchase(&self, user: &AuthUser, purchase_id: Uuid) -> AppResult<()> {
        let scope = self.scope_for(user)?;

        self.within(self.unit_timeout, "Deleting purchase", async {
            let mut tx = self.begin(self.unit_timeout).await?;
            let old = tx
                .lock_stock_in(scope.owner_id, purchase_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

            let delta = purchase_stock_delta(Some(old.effect()), None);
            apply_deltas(tx.as_mut(), &scope, &BTreeMap::from([(old.product_id, delta)])).await?;
            tx.delete_stock_in(old.id).await?;
            tx.commit().await?;

            tracing::info!(delta, "purchase deleted");
            Ok(())
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Manual sales
    // ------------------------------------------------------------------------

    /// Record a manual stock-out against one product
    #[tracing::instrument(name = "stock.record_manual_sale", skip_all, fields(user_id = %user.user_id, product_id = %input.product_id))]
    pub async fn record_manual_sale(
        &self,
        user: &AuthUser,
        input: ManualSaleInput,
    ) -> AppResult<StockOutTransaction> {
        let scope = self.scope_for(user)?;
        input.check()?;

        self.within(self.unit_timeout, "Recording sale", async {
            let mut tx = self.begin(self.unit_timeout).await?;
            ensure_menu(tx.as_mut(), input.menu_id).await?;

            apply_deltas(
                tx.as_mut(),
                &scope,
                &BTreeMap::from([(input.product_id, -input.quantity)]),
            )
            .await?;

            let now = Utc::now();
            let row = StockOutTransaction {
                id: Uuid::new_v4(),
                owner_id: scope.owner_id,
                product_id: input.product_id,
                menu_id: input.menu_id,
                name: input.name.trim().to_string(),
                quantity: input.quantity,
                transaction_date: input.transaction_date.unwrap_or(now),
                note: join_notes([input.note.as_deref()]),
                source: StockOutSource::Manual,
                batch_id: None,
                created_at: now,
                updated_at: now,
            };
            tx.insert_stock_outs(std::slice::from_ref(&row)).await?;
            tx.commit().await?;

            tracing::info!(sale_id = %row.id, quantity = row.quantity, "manual sale recorded");
            Ok(row)
        })
        .await
    }

    /// Change a manual stock-out: restore the old quantity, deduct the new one
    #[tracing::instrument(name = "stock.update_manual_sale", skip_all, fields(user_id = %user.user_id, sale_id = %sale_id))]
    pub async fn update_manual_sale(
        &self,
        user: &AuthUser,
        sale_id: Uuid,
        input: ManualSaleInput,
    ) -> AppResult<StockOutTransaction> {
        let scope = self.scope_for(user)?;
        input.check()?;

        self.within(self.unit_timeout, "Updating sale", async {
            let mut tx = self.begin(self.unit_timeout).await?;
            let old = lock_manual_sale(tx.as_mut(), scope.owner_id, sale_id).await?;
            ensure_menu(tx.as_mut(), input.menu_id).await?;

            let mut deltas = BTreeMap::new();
            *deltas.entry(old.product_id).or_insert(0) += old.quantity;
            *deltas.entry(input.product_id).or_insert(0) -= input.quantity;
            apply_deltas(tx.as_mut(), &scope, &deltas).await?;

            let updated = StockOutTransaction {
                product_id: input.product_id,
                menu_id: input.menu_id,
                name: input.name.trim().to_string(),
                quantity: input.quantity,
                transaction_date: input.transaction_date.unwrap_or(old.transaction_date),
                note: join_notes([input.note.as_deref()]),
                updated_at: Utc::now(),
                ..old.clone()
            };
            tx.update_stock_out(&updated).await?;
            tx.commit().await?;

            tracing::info!(old_quantity = old.quantity, new_quantity = updated.quantity, "manual sale updated");
            Ok(updated)
        })
        .await
    }

    /// Delete a manual stock-out and give its quantity back
    #[tracing::instrument(name = "stock.delete_manual_sale", skip_all, fields(user_id = %user.user_id, sale_id = %sale_id))]
    pub async fn delete_manual_sale(&self, user: &AuthUser, sale_id: Uuid) -> AppResult<()> {
        let scope = self.scope_for(user)?;

        self.within(self.unit_timeout, "Deleting sale", async {
            let mut tx = self.begin(self.unit_timeout).await?;
            let old = lock_manual_sale(tx.as_mut(), scope.owner_id, sale_id).await?;

            apply_deltas(
                tx.as_mut(),
                &scope,
                &BTreeMap::from([(old.product_id, old.quantity)]),
            )
            .await?;
            tx.delete_stock_out(old.id).await?;
            tx.commit().await?;

            tracing::info!(quantity = old.quantity, "manual sale deleted");
            Ok(())
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Recipe driven sales
    // ------------------------------------------------------------------------

    /// Sell portions of a menu, deducting every ingredient of its recipe
    #[tracing::instrument(name = "stock.sell_menu", skip_all, fields(user_id = %user.user_id, menu_id = %input.menu_id, portions = input.portions))]
    pub async fn sell_menu(&self, user: &AuthUser, input: MenuSaleInput) -> AppResult<MenuSaleOutcome> {
        let scope = self.scope_for(user)?;
        validate_sale_quantity(input.portions).map_err(|m| AppError::invalid("portions", m))?;

        self.within(self.unit_timeout, "Selling menu", async {
            let mut tx = self.begin(self.unit_timeout).await?;
            let recipe = tx
                .menu_recipe(input.menu_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Menu".to_string()))?;
            ensure_sellable(&recipe)?;

            let deductions = recipe
                .deductions(input.portions)
                .map_err(|e| AppError::invalid("portions", &e.to_string()))?;
            let totals = aggregate_deductions(&deductions)
                .map_err(|e| AppError::invalid("portions", &e.to_string()))?;
            let products = apply_deltas(tx.as_mut(), &scope, &negated(&totals)).await?;

            let now = Utc::now();
            let batch_id = Uuid::new_v4();
            let transaction_date = input.transaction_date.unwrap_or(now);
            let note = join_notes([input.note.as_deref()]);
            let rows: Vec<StockOutTransaction> = deductions
                .iter()
                .map(|d| StockOutTransaction {
                    id: Uuid::new_v4(),
                    owner_id: scope.owner_id,
                    product_id: d.product_id,
                    menu_id: Some(recipe.menu.id),
                    name: format!(
                        "{} x{} - {}",
                        recipe.menu.name,
                        input.portions,
                        product_name(&products, d.product_id)
                    ),
                    quantity: d.quantity,
                    transaction_date,
                    note: note.clone(),
                    source: StockOutSource::RecipeSale,
                    batch_id: Some(batch_id),
                    created_at: now,
                    updated_at: now,
                })
                .collect();

            tx.insert_stock_outs(&rows).await?;
            tx.commit().await?;

            tracing::info!(%batch_id, rows = rows.len(), "menu sold");
            Ok(MenuSaleOutcome { batch_id, rows })
        })
        .await
    }

    /// Import a cashier sales sheet as one all-or-nothing batch
    #[tracing::instrument(name = "stock.process_sales_csv", skip_all, fields(user_id = %user.user_id, bytes = csv_text.len()))]
    pub async fn process_sales_csv(
        &self,
        user: &AuthUser,
        csv_text: &str,
        general_note: Option<&str>,
    ) -> AppResult<CsvImportOutcome> {
        let scope = self.scope_for(user)?;
        let rows = parse_sales_csv(csv_text, Utc::now())?;
        tracing::debug!(rows = rows.len(), "sales sheet parsed");

        self.within(self.csv_timeout, "CSV import", async {
            let mut tx = self.begin(self.csv_timeout).await?;

            let codes = references_by(&rows, MatchBy::Code);
            let names = references_by(&rows, MatchBy::Name);
            let recipes = tx.menu_recipes_by_reference(&codes, &names).await?;
            let lookup = MenuLookup::new(&recipes);

            // One entry per (sheet row, recipe line), in file order
            let mut expanded: Vec<(&SalesCsvRow, &Menu, IngredientDeduction)> = Vec::new();
            let mut totals = BTreeMap::new();
            for row in &rows {
                let recipe = lookup.find(&row.menu_reference, row.match_by).ok_or_else(|| {
                    AppError::NotFound(format!(
                        "Menu '{}' (line {})",
                        row.menu_reference, row.line
                    ))
                })?;
                if recipe.lines.is_empty() {
                    return Err(AppError::csv_line(
                        row.line,
                        format!("menu '{}' has no recipe and cannot be sold", recipe.menu.name),
                    ));
                }
                let overflow = |_: QuantityOverflow| {
                    AppError::csv_line(row.line, "quantity is too large for this menu's recipe")
                };
                for deduction in recipe.deductions(row.quantity).map_err(overflow)? {
                    add_deduction(&mut totals, &deduction).map_err(overflow)?;
                    expanded.push((row, &recipe.menu, deduction));
                }
            }

            let products = apply_deltas(tx.as_mut(), &scope, &negated(&totals)).await?;

            let now = Utc::now();
            let batch_id = Uuid::new_v4();
            let ledger: Vec<StockOutTransaction> = expanded
                .iter()
                .map(|(row, menu, deduction)| StockOutTransaction {
                    id: Uuid::new_v4(),
                    owner_id: scope.owner_id,
                    product_id: deduction.product_id,
                    menu_id: Some(menu.id),
                    name: format!(
                        "{} x{} - {} (line {})",
                        menu.name,
                        row.quantity,
                        product_name(&products, deduction.product_id),
                        row.line
                    ),
                    quantity: deduction.quantity,
                    transaction_date: row.transaction_date,
                    note: join_notes([row.note.as_deref(), general_note]),
                    source: StockOutSource::Csv,
                    batch_id: Some(batch_id),
                    created_at: now,
                    updated_at: now,
                })
                .collect();

            tx.insert_stock_outs(&ledger).await?;
            tx.commit().await?;

            tracing::info!(%batch_id, sheet_rows = rows.len(), ledger_rows = ledger.len(), products = totals.len(), "sales sheet imported");
            Ok(CsvImportOutcome {
                created_count: ledger.len(),
                batch_id,
            })
        })
        .await
    }
}

// ============================================================================
// Unit of work helpers
// ============================================================================

/// Lock every product in `deltas`, check that none would go negative, then
/// apply all deltas. Zero deltas still require the product to exist in scope.
/// Returns the locked products as they were before the change.
async fn apply_deltas(
    tx: &mut dyn StockTx,
    scope: &OwnerScope,
    deltas: &BTreeMap<Uuid, i64>,
) -> AppResult<HashMap<Uuid, Product>> {
    let ids: Vec<Uuid> = deltas.keys().copied().collect();
    let locked: HashMap<Uuid, Product> = tx
        .lock_products(scope, &ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    for (id, delta) in deltas {
        let product = locked
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Product {}", id)))?;
        let after = product
            .quantity
            .checked_add(*delta)
            .ok_or_else(|| AppError::invalid("quantity", "Quantity is out of range"))?;
        if after < 0 {
            return Err(AppError::InsufficientStock {
                product: product.name.clone(),
                available: product.quantity,
                requested: delta.saturating_neg(),
            });
        }
    }

    for (id, delta) in deltas {
        if *delta != 0 {
            tx.adjust_quantity(*id, *delta).await?;
        }
    }

    Ok(locked)
}

async fn ensure_supplier(
    tx: &mut dyn StockTx,
    scope: &OwnerScope,
    supplier_id: Option<Uuid>,
) -> AppResult<()> {
    if let Some(id) = supplier_id {
        tx.find_supplier(scope, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;
    }
    Ok(())
}

async fn ensure_menu(tx: &mut dyn StockTx, menu_id: Option<Uuid>) -> AppResult<()> {
    if let Some(id) = menu_id {
        tx.menu_recipe(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Menu".to_string()))?;
    }
    Ok(())
}

async fn lock_manual_sale(
    tx: &mut dyn StockTx,
    owner_id: Uuid,
    sale_id: Uuid,
) -> AppResult<StockOutTransaction> {
    let sale = tx
        .lock_stock_out(owner_id, sale_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;
    if !sale.source.is_editable() {
        return Err(AppError::Conflict {
            resource: "sale".to_string(),
            message: format!(
                "{} sales are part of a batch and cannot be changed individually",
                sale.source
            ),
            message_id: "Penjualan ini bagian dari satu batch dan tidak dapat diubah satu per satu"
                .to_string(),
        });
    }
    Ok(sale)
}

fn ensure_sellable(recipe: &MenuRecipe) -> AppResult<()> {
    if recipe.lines.is_empty() {
        return Err(AppError::Validation {
            field: "menu_id".to_string(),
            message: format!("Menu '{}' has no recipe and cannot be sold", recipe.menu.name),
            message_id: format!("Menu '{}' belum memiliki resep", recipe.menu.name),
        });
    }
    Ok(())
}

fn negated(totals: &BTreeMap<Uuid, i64>) -> BTreeMap<Uuid, i64> {
    totals.iter().map(|(id, qty)| (*id, qty.saturating_neg())).collect()
}

/// Distinct references read from one menu column
fn references_by(rows: &[SalesCsvRow], match_by: MatchBy) -> Vec<String> {
    let mut references: Vec<String> = rows
        .iter()
        .filter(|r| r.match_by == match_by)
        .map(|r| r.menu_reference.clone())
        .collect();
    references.sort();
    references.dedup();
    references
}

fn product_name(products: &HashMap<Uuid, Product>, id: Uuid) -> &str {
    products.get(&id).map(|p| p.name.as_str()).unwrap_or("?")
}

/// Resolves sheet references against the column they were read from
struct MenuLookup<'a> {
    by_code: HashMap<String, &'a MenuRecipe>,
    by_name: HashMap<String, &'a MenuRecipe>,
}

impl<'a> MenuLookup<'a> {
    fn new(recipes: &'a [MenuRecipe]) -> Self {
        let mut by_code = HashMap::new();
        let mut by_name = HashMap::new();
        for recipe in recipes {
            by_code.insert(recipe.menu.code.trim().to_lowercase(), recipe);
            by_name
                .entry(recipe.menu.name.trim().to_lowercase())
                .or_insert(recipe);
        }
        Self { by_code, by_name }
    }

    fn find(&self, reference: &str, match_by: MatchBy) -> Option<&'a MenuRecipe> {
        let key = reference.trim().to_lowercase();
        match match_by {
            MatchBy::Code => self.by_code.get(&key),
            MatchBy::Name => self.by_name.get(&key),
        }
        .copied()
    }
}
