//! HTTP handler for the dashboard aggregates

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::{DashboardQuery, DashboardSummary};
use crate::services::DashboardService;
use crate::AppState;

pub async fn get_dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<DashboardSummary>> {
    let scope = state.tenancy.resolve(&user)?;
    let summary = DashboardService::new(state.db).summary(&scope, query).await?;
    Ok(Json(summary))
}
