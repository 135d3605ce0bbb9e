//! Supplier directory

use serde::Deserialize;
use shared::models::Supplier;
use shared::validation::validate_label;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::postgres::{SupplierRow, SUPPLIER_COLUMNS};
use crate::tenancy::OwnerScope;

#[derive(Debug, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl SupplierInput {
    fn check(&self) -> AppResult<()> {
        validate_label(&self.name).map_err(|m| AppError::invalid("name", m))
    }
}

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, scope: &OwnerScope) -> AppResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {} FROM suppliers WHERE owner_id = ANY($1) ORDER BY name",
            SUPPLIER_COLUMNS
        ))
        .bind(scope.owner_ids())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    pub async fn create(&self, scope: &OwnerScope, input: SupplierInput) -> AppResult<Supplier> {
        input.check()?;

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "INSERT INTO suppliers (id, owner_id, name, phone, address) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            SUPPLIER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(scope.owner_id)
        .bind(input.name.trim())
        .bind(blank_to_none(&input.phone))
        .bind(blank_to_none(&input.address))
        .fetch_one(&self.db)
        .await?;

        Ok(Supplier::from(row))
    }

    pub async fn update(
        &self,
        scope: &OwnerScope,
        id: Uuid,
        input: SupplierInput,
    ) -> AppResult<Supplier> {
        input.check()?;

        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "UPDATE suppliers SET name = $3, phone = $4, address = $5, updated_at = NOW() \
             WHERE id = $1 AND owner_id = $2 RETURNING {}",
            SUPPLIER_COLUMNS
        ))
        .bind(id)
        .bind(scope.owner_id)
        .bind(input.name.trim())
        .bind(blank_to_none(&input.phone))
        .bind(blank_to_none(&input.address))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))?;

        Ok(Supplier::from(row))
    }

    /// Products and purchases keep their rows; the foreign keys null the reference.
    pub async fn delete(&self, scope: &OwnerScope, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(scope.owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Supplier".to_string()));
        }
        tracing::info!(supplier_id = %id, "supplier deleted");
        Ok(())
    }
}
