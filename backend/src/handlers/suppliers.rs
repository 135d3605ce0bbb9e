//! HTTP handlers for suppliers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::models::Supplier;
use uuid::Uuid;

use super::OWNER_ONLY;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::suppliers::SupplierInput;
use crate::services::SupplierService;
use crate::AppState;

pub async fn list_suppliers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Supplier>>> {
    let scope = state.tenancy.resolve(&user)?;
    let suppliers = SupplierService::new(state.db).list(&scope).await?;
    Ok(Json(suppliers))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    user.require_any_role(OWNER_ONLY)?;
    let scope = state.tenancy.resolve(&user)?;
    let supplier = SupplierService::new(state.db).create(&scope, input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    user.require_any_role(OWNER_ONLY)?;
    let scope = state.tenancy.resolve(&user)?;
    let supplier = SupplierService::new(state.db)
        .update(&scope, supplier_id, input)
        .await?;
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_any_role(OWNER_ONLY)?;
    let scope = state.tenancy.resolve(&user)?;
    SupplierService::new(state.db).delete(&scope, supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
