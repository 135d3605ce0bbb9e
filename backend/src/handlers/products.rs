//! HTTP handlers for the product catalog

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::Product;
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::OWNER_ONLY;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::products::{CreateProductInput, ProductQuery, UpdateProductInput};
use crate::services::ProductService;
use crate::AppState;

/// List products visible to the caller
pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let scope = state.tenancy.resolve(&user)?;
    let products = ProductService::new(state.db).list(&scope, query).await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let scope = state.tenancy.resolve(&user)?;
    let product = ProductService::new(state.db).get(&scope, product_id).await?;
    Ok(Json(product))
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    user.require_any_role(OWNER_ONLY)?;
    let scope = state.tenancy.resolve(&user)?;
    let product = ProductService::new(state.db).create(&scope, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Update catalog fields; the quantity is left untouched
pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    user.require_any_role(OWNER_ONLY)?;
    let scope = state.tenancy.resolve(&user)?;
    let product = ProductService::new(state.db)
        .update(&scope, product_id, input)
        .await?;
    Ok(Json(product))
}

pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_any_role(OWNER_ONLY)?;
    let scope = state.tenancy.resolve(&user)?;
    ProductService::new(state.db).delete(&scope, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
