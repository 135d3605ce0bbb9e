//! HTTP handlers for menus and recipes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::models::{Menu, MenuRecipe};
use uuid::Uuid;

use super::OWNER_ONLY;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::menus::{MenuInput, SetRecipeInput};
use crate::services::MenuService;
use crate::AppState;

pub async fn list_menus(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<Vec<Menu>>> {
    let menus = MenuService::new(state.db).list().await?;
    Ok(Json(menus))
}

/// A menu with its recipe
pub async fn get_menu(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(menu_id): Path<Uuid>,
) -> AppResult<Json<MenuRecipe>> {
    let menu = MenuService::new(state.db).get(menu_id).await?;
    Ok(Json(menu))
}

pub async fn create_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<MenuInput>,
) -> AppResult<(StatusCode, Json<Menu>)> {
    user.require_any_role(OWNER_ONLY)?;
    let menu = MenuService::new(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(menu)))
}

pub async fn update_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(menu_id): Path<Uuid>,
    Json(input): Json<MenuInput>,
) -> AppResult<Json<Menu>> {
    user.require_any_role(OWNER_ONLY)?;
    let menu = MenuService::new(state.db).update(menu_id, input).await?;
    Ok(Json(menu))
}

pub async fn delete_menu(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(menu_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require_any_role(OWNER_ONLY)?;
    MenuService::new(state.db).delete(menu_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace a menu's recipe lines
pub async fn set_menu_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(menu_id): Path<Uuid>,
    Json(input): Json<SetRecipeInput>,
) -> AppResult<Json<MenuRecipe>> {
    user.require_any_role(OWNER_ONLY)?;
    let scope = state.tenancy.resolve(&user)?;
    let recipe = MenuService::new(state.db)
        .set_recipe(&scope, menu_id, input)
        .await?;
    Ok(Json(recipe))
}
