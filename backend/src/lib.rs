//! Kedai inventory back-office
//!
//! Product catalog, purchases, sales and low stock alerts for small food
//! businesses. Stock quantities change only through
//! [`services::StockAdjustmentEngine`].

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;
pub mod tenancy;

pub use config::Config;

use crate::services::{LowStockNotifier, StockAdjustmentEngine};
use crate::store::PgStockStore;
use crate::tenancy::{ConfiguredTenancy, TenancyResolver};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub tenancy: Arc<dyn TenancyResolver>,
    pub stock: Arc<StockAdjustmentEngine>,
    pub notifier: Arc<LowStockNotifier>,
}

impl AppState {
    /// Wire the Postgres store and configured tenancy into the engine and notifier
    pub fn new(db: PgPool, config: Config) -> Self {
        let store = Arc::new(PgStockStore::new(db.clone()));
        let tenancy: Arc<dyn TenancyResolver> =
            Arc::new(ConfiguredTenancy::from_config(&config.tenancy));

        let stock = Arc::new(StockAdjustmentEngine::new(
            store.clone(),
            tenancy.clone(),
            &config.stock,
        ));
        let notifier = Arc::new(LowStockNotifier::new(
            store,
            tenancy.clone(),
            config.stock.default_timeout(),
        ));

        Self {
            db,
            config: Arc::new(config),
            tenancy,
            stock,
            notifier,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Kedai Inventory API v1"
}
