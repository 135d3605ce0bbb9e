//! Route definitions for the Kedai inventory API

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .nest("/users", user_routes(state.clone()))
        .nest("/products", product_routes(state.clone()))
        .nest("/suppliers", supplier_routes(state.clone()))
        .nest("/menus", menu_routes(state.clone()))
        .nest("/purchases", purchase_routes(state.clone()))
        .nest("/sales", sale_routes(state.clone()))
        .nest("/notifications", notification_routes(state.clone()))
        .nest("/dashboard", dashboard_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/register-owner", post(handlers::register_owner))
}

/// Account management routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/:user_id/active", put(handlers::set_user_active))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            put(handlers::update_supplier).delete(handlers::delete_supplier),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Menu and recipe routes (protected)
fn menu_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_menus).post(handlers::create_menu))
        .route(
            "/:menu_id",
            get(handlers::get_menu)
                .put(handlers::update_menu)
                .delete(handlers::delete_menu),
        )
        .route("/:menu_id/recipe", put(handlers::set_menu_recipe))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Purchase (stock-in) routes (protected)
fn purchase_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route(
            "/:purchase_id",
            put(handlers::update_purchase).delete(handlers::delete_purchase),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Sales (stock-out) routes (protected)
fn sale_routes(state: AppState) -> Router<AppState> {
    let upload_limit = state.config.stock.csv_max_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route(
            "/import",
            post(handlers::import_sales_csv).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/menu", post(handlers::sell_menu))
        .route(
            "/:sale_id",
            put(handlers::update_sale).delete(handlers::delete_sale),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Notification routes (protected)
fn notification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(handlers::get_low_stock_alerts))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Dashboard routes (protected)
fn dashboard_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_dashboard))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
