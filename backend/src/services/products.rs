//! Product catalog
//!
//! Catalog updates never touch `quantity`; after creation only the stock
//! engine changes it.

use serde::Deserialize;
use shared::models::{Product, StockStatus, StockUnit};
use shared::types::{PaginatedResponse, Pagination};
use shared::validation::{validate_amount, validate_label, validate_purchase_quantity, validate_threshold};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::postgres::{convert_rows, ProductRow, PRODUCT_COLUMNS};
use crate::tenancy::OwnerScope;

/// New product
#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub category: String,
    pub unit: StockUnit,
    pub price: i64,
    /// Initial stock
    #[serde(default)]
    pub quantity: i64,
    pub low_stock_threshold: Option<i64>,
    pub supplier_id: Option<Uuid>,
}

/// Catalog fields of a product; quantity is not editable here
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub name: String,
    pub category: String,
    pub unit: StockUnit,
    pub price: i64,
    pub low_stock_threshold: Option<i64>,
    pub supplier_id: Option<Uuid>,
}

/// List filters
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    /// Only products in this stock status
    pub status: Option<StockStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn check_catalog_fields(
    name: &str,
    category: &str,
    price: i64,
    threshold: Option<i64>,
) -> AppResult<()> {
    validate_label(name).map_err(|m| AppError::invalid("name", m))?;
    validate_label(category).map_err(|m| AppError::invalid("category", m))?;
    validate_amount(price).map_err(|m| AppError::invalid("price", m))?;
    validate_threshold(threshold).map_err(|m| AppError::invalid("low_stock_threshold", m))?;
    Ok(())
}

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn ensure_supplier(&self, scope: &OwnerScope, supplier_id: Option<Uuid>) -> AppResult<()> {
        let Some(id) = supplier_id else {
            return Ok(());
        };
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = $1 AND owner_id = ANY($2))",
        )
        .bind(id)
        .bind(scope.owner_ids())
        .fetch_one(&self.db)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        Ok(())
    }

    pub async fn list(
        &self,
        scope: &OwnerScope,
        query: ProductQuery,
    ) -> AppResult<PaginatedResponse<Product>> {
        let pagination = Pagination::normalized(query.page, query.per_page);
        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE owner_id = ANY($1) \
             AND ($2::text IS NULL OR LOWER(name) LIKE $2) \
             AND ($3::text IS NULL OR category = $3) \
             ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .bind(scope.owner_ids())
        .bind(&search)
        .bind(&query.category)
        .fetch_all(&self.db)
        .await?;

        // Status is derived, so it is filtered after loading
        let mut products: Vec<Product> = convert_rows(rows)?;
        if let Some(status) = query.status {
            products.retain(|p| p.stock_status() == status);
        }

        let total = products.len() as u64;
        let page: Vec<Product> = products
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect();

        Ok(PaginatedResponse::new(page, &pagination, total))
    }

    pub async fn get(&self, scope: &OwnerScope, id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE id = $1 AND owner_id = ANY($2)",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner_ids())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Product::try_from(row)
    }

    pub async fn create(&self, scope: &OwnerScope, input: CreateProductInput) -> AppResult<Product> {
        check_catalog_fields(&input.name, &input.category, input.price, input.low_stock_threshold)?;
        validate_purchase_quantity(input.quantity).map_err(|m| AppError::invalid("quantity", m))?;
        self.ensure_supplier(scope, input.supplier_id).await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products (id, owner_id, name, category, unit, price, quantity, \
             low_stock_threshold, supplier_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(scope.owner_id)
        .bind(input.name.trim())
        .bind(input.category.trim())
        .bind(input.unit.as_str())
        .bind(input.price)
        .bind(input.quantity)
        .bind(input.low_stock_threshold)
        .bind(input.supplier_id)
        .fetch_one(&self.db)
        .await?;

        let product = Product::try_from(row)?;
        tracing::info!(product_id = %product.id, quantity = product.quantity, "product created");
        Ok(product)
    }

    pub async fn update(
        &self,
        scope: &OwnerScope,
        id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        check_catalog_fields(&input.name, &input.category, input.price, input.low_stock_threshold)?;
        self.ensure_supplier(scope, input.supplier_id).await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET name = $3, category = $4, unit = $5, price = $6, \
             low_stock_threshold = $7, supplier_id = $8, updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 RETURNING {}",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner_id)
        .bind(input.name.trim())
        .bind(input.category.trim())
        .bind(input.unit.as_str())
        .bind(input.price)
        .bind(input.low_stock_threshold)
        .bind(input.supplier_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Product::try_from(row)
    }

    /// Delete a product that no ledger row or recipe refers to
    pub async fn delete(&self, scope: &OwnerScope, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM products WHERE id = $1 AND owner_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(scope.owner_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM stock_in_transactions WHERE product_id = $1) \
             OR EXISTS(SELECT 1 FROM stock_out_transactions WHERE product_id = $1) \
             OR EXISTS(SELECT 1 FROM recipe_lines WHERE product_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: "Product has transactions or is used in a recipe and cannot be deleted"
                    .to_string(),
                message_id: "Produk memiliki transaksi atau dipakai dalam resep sehingga tidak dapat dihapus"
                    .to_string(),
            });
        }

        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}
