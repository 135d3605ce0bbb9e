//! HTTP handlers for low stock notifications

use axum::{extract::State, Json};
use shared::models::LowStockAlert;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Current low stock alerts, newest first
pub async fn get_low_stock_alerts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<LowStockAlert>>> {
    let alerts = state.notifier.current_alerts(&user).await?;
    Ok(Json(alerts))
}
