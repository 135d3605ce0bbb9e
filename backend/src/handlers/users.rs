//! HTTP handlers for account management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::models::User;
use uuid::Uuid;

use super::OWNER_ONLY;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::users::{CreateUserInput, SetActiveInput};
use crate::services::UserService;
use crate::AppState;

/// List the owner's account and staff
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    user.require_any_role(OWNER_ONLY)?;
    let users = UserService::new(state.db).list(&user).await?;
    Ok(Json(users))
}

/// Create an account
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    user.require_any_role(OWNER_ONLY)?;
    let created = UserService::new(state.db).create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Enable or disable a staff account
pub async fn set_user_active(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<SetActiveInput>,
) -> AppResult<Json<User>> {
    user.require_any_role(OWNER_ONLY)?;
    let updated = UserService::new(state.db)
        .set_active(&user, user_id, input.is_active)
        .await?;
    Ok(Json(updated))
}
