//! HTTP handlers for purchases (stock-in)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::StockInTransaction;
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::{OWNER_ONLY, OWNER_OR_STAFF};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ledger::LedgerQuery;
use crate::services::stock::PurchaseInput;
use crate::services::LedgerService;
use crate::AppState;

pub async fn list_purchases(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<PaginatedResponse<StockInTransaction>>> {
    user.require_any_role(OWNER_OR_STAFF)?;
    let scope = state.tenancy.resolve(&user)?;
    let purchases = LedgerService::new(state.db)
        .list_purchases(&scope, query)
        .await?;
    Ok(Json(purchases))
}

pub async fn create_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<PurchaseInput>,
) -> AppResult<(StatusCode, Json<StockInTransaction>)> {
    user.require_any_role(OWNER_OR_STAFF)?;
    let purchase = state.stock.record_purchase(&user, input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn update_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(purchase_id): Path<Uuid>,
    Json(input): Json<PurchaseInput>,
) -> AppResult<Json<StockInTransaction>> {
    user.require_any_role(OWNER_OR_STAFF)?;
    let purchase = state.stock.update_purchase(&user, purchase_id, input).await?;
    Ok(Json(purchase))
}

pub async fn delete_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(purchase_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_any_role(OWNER_ONLY)?;
    state.stock.delete_purchase(&user, purchase_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
