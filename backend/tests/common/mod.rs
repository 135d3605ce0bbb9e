//! Shared fixtures for the engine tests
//!
//! Everything runs against the in-process store, so no database is needed.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use kedai_backend::config::StockConfig;
use kedai_backend::middleware::AuthUser;
use kedai_backend::services::stock::{ManualSaleInput, PurchaseInput};
use kedai_backend::services::{LowStockNotifier, StockAdjustmentEngine};
use kedai_backend::store::MemoryStockStore;
use kedai_backend::tenancy::ConfiguredTenancy;
use rust_decimal::Decimal;
use shared::models::{Menu, Product, PurchaseStatus, RecipeLine, Role, StockUnit};
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub struct Fixture {
    pub store: MemoryStockStore,
    pub engine: Arc<StockAdjustmentEngine>,
    pub notifier: LowStockNotifier,
    pub owner: AuthUser,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_tenancy(ConfiguredTenancy::default())
    }

    pub fn with_tenancy(tenancy: ConfiguredTenancy) -> Self {
        let store = MemoryStockStore::new();
        let tenancy = Arc::new(tenancy);
        let config = StockConfig::default();
        let engine = Arc::new(StockAdjustmentEngine::new(
            Arc::new(store.clone()),
            tenancy.clone(),
            &config,
        ));
        let notifier = LowStockNotifier::new(
            Arc::new(store.clone()),
            tenancy,
            config.default_timeout(),
        );

        Self {
            store,
            engine,
            notifier,
            owner: AuthUser::new(Uuid::new_v4(), vec![Role::Owner]),
        }
    }

    /// Staff account employed by the fixture's owner
    pub fn staff(&self) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            roles: vec![Role::Pegawai],
            employer_id: Some(self.owner.user_id),
        }
    }

    pub async fn product(&self, name: &str, quantity: i64, threshold: Option<i64>) -> Uuid {
        self.product_for(self.owner.user_id, name, quantity, threshold).await
    }

    pub async fn product_for(
        &self,
        owner_id: Uuid,
        name: &str,
        quantity: i64,
        threshold: Option<i64>,
    ) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        self.store
            .insert_product(Product {
                id,
                owner_id,
                name: name.to_string(),
                category: "Bahan".to_string(),
                unit: StockUnit::Gram,
                price: 100,
                quantity,
                low_stock_threshold: threshold,
                supplier_id: None,
                created_at: now,
                updated_at: now,
            })
            .await;
        id
    }

    /// Menu with `(product, quantity per portion)` recipe lines
    pub async fn menu(&self, code: &str, name: &str, lines: &[(Uuid, &str)]) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let recipe = lines
            .iter()
            .map(|(product_id, qty)| RecipeLine {
                menu_id: id,
                product_id: *product_id,
                quantity_per_portion: dec(qty),
            })
            .collect();
        self.store
            .insert_menu(
                Menu {
                    id,
                    code: code.to_string(),
                    name: name.to_string(),
                    price: 15000,
                    created_at: now,
                    updated_at: now,
                },
                recipe,
            )
            .await;
        id
    }

    pub async fn quantity(&self, product_id: Uuid) -> i64 {
        self.store.product(product_id).await.unwrap().quantity
    }
}

pub fn purchase(product_id: Uuid, quantity: i64, status: PurchaseStatus) -> PurchaseInput {
    PurchaseInput {
        product_id,
        supplier_id: None,
        name: "Belanja pasar".to_string(),
        quantity,
        total_amount: quantity * 100,
        payment_method: "Tunai".to_string(),
        status,
        transaction_date: None,
    }
}

pub fn manual_sale(product_id: Uuid, quantity: i64) -> ManualSaleInput {
    ManualSaleInput {
        product_id,
        menu_id: None,
        name: "Pemakaian dapur".to_string(),
        quantity,
        transaction_date: None,
        note: None,
    }
}
