//! Owner scope tests
//!
//! Staff write against their employer's catalog, owners never see each
//! other's products, and a designated owner's catalog is shared read-only
//! for product lookups.

mod common;

use common::{manual_sale, purchase, Fixture};
use kedai_backend::error::AppError;
use kedai_backend::middleware::AuthUser;
use kedai_backend::tenancy::ConfiguredTenancy;
use shared::models::{PurchaseStatus, Role};
use uuid::Uuid;

#[tokio::test]
async fn test_staff_sales_land_on_employer() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 10, None).await;

    let sale = fx
        .engine
        .record_manual_sale(&fx.staff(), manual_sale(gula, 4))
        .await
        .unwrap();
    assert_eq!(sale.owner_id, fx.owner.user_id);
    assert_eq!(fx.quantity(gula).await, 6);
}

#[tokio::test]
async fn test_other_owner_products_are_invisible() {
    let fx = Fixture::new();
    let stranger = Uuid::new_v4();
    let gula = fx.product_for(stranger, "Gula", 10, None).await;

    let err = fx
        .engine
        .record_manual_sale(&fx.owner, manual_sale(gula, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(fx.quantity(gula).await, 10);
}

#[tokio::test]
async fn test_other_owner_rows_cannot_be_edited() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 10, None).await;
    let row = fx
        .engine
        .record_purchase(&fx.owner, purchase(gula, 5, PurchaseStatus::Completed))
        .await
        .unwrap();

    let intruder = AuthUser::new(Uuid::new_v4(), vec![Role::Owner]);
    assert!(matches!(
        fx.engine.delete_purchase(&intruder, row.id).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(fx.quantity(gula).await, 15);
}

#[tokio::test]
async fn test_unassigned_staff_is_forbidden() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 10, None).await;
    let loose = AuthUser::new(Uuid::new_v4(), vec![Role::Pegawai]);

    assert!(matches!(
        fx.engine.record_manual_sale(&loose, manual_sale(gula, 1)).await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_unassigned_staff_fall_back_to_designated_owner() {
    let designated = Uuid::new_v4();
    let fx = Fixture::with_tenancy(ConfiguredTenancy::new(Some(designated)));
    let gula = fx.product_for(designated, "Gula", 10, None).await;
    let loose = AuthUser::new(Uuid::new_v4(), vec![Role::Pegawai]);

    let sale = fx
        .engine
        .record_manual_sale(&loose, manual_sale(gula, 2))
        .await
        .unwrap();
    assert_eq!(sale.owner_id, designated);
    assert_eq!(fx.quantity(gula).await, 8);
}

#[tokio::test]
async fn test_owner_can_use_shared_catalog() {
    let designated = Uuid::new_v4();
    let fx = Fixture::with_tenancy(ConfiguredTenancy::new(Some(designated)));
    let shared_gula = fx.product_for(designated, "Gula", 10, None).await;

    let sale = fx
        .engine
        .record_manual_sale(&fx.owner, manual_sale(shared_gula, 3))
        .await
        .unwrap();
    // Ledger rows belong to the acting owner
    assert_eq!(sale.owner_id, fx.owner.user_id);
    assert_eq!(fx.quantity(shared_gula).await, 7);
}
