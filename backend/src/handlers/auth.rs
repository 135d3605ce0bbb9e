//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::services::auth::{AuthTokens, LoginInput, RegisterOwnerInput};
use crate::services::AuthService;
use crate::AppState;

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> AppResult<Json<AuthTokens>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.login(body).await?;
    Ok(Json(tokens))
}

/// Bootstrap the first owner account
pub async fn register_owner(
    State(state): State<AppState>,
    Json(body): Json<RegisterOwnerInput>,
) -> AppResult<(StatusCode, Json<AuthTokens>)> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.register_owner(body).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}
