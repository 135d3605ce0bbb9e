//! Menus and their recipes

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::models::{Menu, MenuRecipe, RecipeLine};
use shared::validation::{validate_amount, validate_label, validate_menu_code};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::postgres::{MenuRow, RecipeLineRow, MENU_COLUMNS};
use crate::tenancy::OwnerScope;

#[derive(Debug, Deserialize)]
pub struct MenuInput {
    pub code: String,
    pub name: String,
    pub price: i64,
}

impl MenuInput {
    fn check(&self) -> AppResult<()> {
        validate_menu_code(&self.code).map_err(|m| AppError::invalid("code", m))?;
        validate_label(&self.name).map_err(|m| AppError::invalid("name", m))?;
        validate_amount(self.price).map_err(|m| AppError::invalid("price", m))?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RecipeLineInput {
    pub product_id: Uuid,
    pub quantity_per_portion: Decimal,
}

/// Full replacement of a menu's recipe
#[derive(Debug, Deserialize)]
pub struct SetRecipeInput {
    pub lines: Vec<RecipeLineInput>,
}

impl SetRecipeInput {
    fn check(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for line in &self.lines {
            if line.quantity_per_portion < Decimal::ZERO {
                return Err(AppError::invalid(
                    "quantity_per_portion",
                    "Quantity per portion cannot be negative",
                ));
            }
            if !seen.insert(line.product_id) {
                return Err(AppError::invalid(
                    "lines",
                    "A product may appear only once in a recipe",
                ));
            }
        }
        Ok(())
    }
}

fn map_duplicate_code(error: sqlx::Error) -> AppError {
    match error {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::DuplicateEntry("code".to_string())
        }
        other => AppError::DatabaseError(other),
    }
}

#[derive(Clone)]
pub struct MenuService {
    db: PgPool,
}

impl MenuService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<Menu>> {
        let rows = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus ORDER BY name",
            MENU_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Menu::from).collect())
    }

    /// A menu with its recipe lines
    pub async fn get(&self, id: Uuid) -> AppResult<MenuRecipe> {
        let menu = sqlx::query_as::<_, MenuRow>(&format!(
            "SELECT {} FROM menus WHERE id = $1",
            MENU_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Menu".to_string()))?;

        let lines = sqlx::query_as::<_, RecipeLineRow>(
            "SELECT menu_id, product_id, quantity_per_portion FROM recipe_lines \
             WHERE menu_id = $1 ORDER BY product_id",
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(MenuRecipe {
            menu: Menu::from(menu),
            lines: lines.into_iter().map(RecipeLine::from).collect(),
        })
    }

    pub async fn create(&self, input: MenuInput) -> AppResult<Menu> {
        input.check()?;

        let row = sqlx::query_as::<_, MenuRow>(&format!(
            "INSERT INTO menus (id, code, name, price) VALUES ($1, $2, $3, $4) RETURNING {}",
            MENU_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.code.trim())
        .bind(input.name.trim())
        .bind(input.price)
        .fetch_one(&self.db)
        .await
        .map_err(map_duplicate_code)?;

        Ok(Menu::from(row))
    }

    pub async fn update(&self, id: Uuid, input: MenuInput) -> AppResult<Menu> {
        input.check()?;

        let row = sqlx::query_as::<_, MenuRow>(&format!(
            "UPDATE menus SET code = $2, name = $3, price = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            MENU_COLUMNS
        ))
        .bind(id)
        .bind(input.code.trim())
        .bind(input.name.trim())
        .bind(input.price)
        .fetch_optional(&self.db)
        .await
        .map_err(map_duplicate_code)?
        .ok_or_else(|| AppError::NotFound("Menu".to_string()))?;

        Ok(Menu::from(row))
    }

    /// Recipe lines go with the menu; past sales keep their rows with the menu reference cleared.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Menu".to_string()));
        }
        tracing::info!(menu_id = %id, "menu deleted");
        Ok(())
    }

    /// Replace the recipe. Every ingredient must be a product in the caller's scope.
    pub async fn set_recipe(
        &self,
        scope: &OwnerScope,
        menu_id: Uuid,
        input: SetRecipeInput,
    ) -> AppResult<MenuRecipe> {
        input.check()?;

        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, Uuid>("SELECT id FROM menus WHERE id = $1 FOR UPDATE")
            .bind(menu_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Menu".to_string()))?;

        let product_ids: Vec<Uuid> = input.lines.iter().map(|l| l.product_id).collect();
        let found: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM products WHERE id = ANY($1) AND owner_id = ANY($2)",
        )
        .bind(&product_ids)
        .bind(scope.owner_ids())
        .fetch_all(&mut *tx)
        .await?;

        if let Some(missing) = product_ids.iter().find(|id| !found.contains(id)) {
            return Err(AppError::NotFound(format!("Product {}", missing)));
        }

        sqlx::query("DELETE FROM recipe_lines WHERE menu_id = $1")
            .bind(menu_id)
            .execute(&mut *tx)
            .await?;

        let quantities: Vec<Decimal> = input.lines.iter().map(|l| l.quantity_per_portion).collect();
        sqlx::query(
            "INSERT INTO recipe_lines (menu_id, product_id, quantity_per_portion) \
             SELECT $1, * FROM UNNEST($2::uuid[], $3::numeric[])",
        )
        .bind(menu_id)
        .bind(&product_ids)
        .bind(&quantities)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE menus SET updated_at = NOW() WHERE id = $1")
            .bind(menu_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(menu_id = %menu_id, lines = product_ids.len(), "recipe replaced");

        self.get(menu_id).await
    }
}
