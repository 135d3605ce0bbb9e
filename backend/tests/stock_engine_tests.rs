//! Stock adjustment engine tests
//!
//! Covers purchase status transitions, manual sale reversal, recipe sales,
//! the stock floor guard and concurrent depleting writers.

mod common;

use common::{manual_sale, purchase, Fixture};
use kedai_backend::error::AppError;
use kedai_backend::services::stock::{MenuSaleInput, PurchaseInput};
use proptest::prelude::*;
use shared::models::{PurchaseStatus, StockOutSource};
use uuid::Uuid;

use PurchaseStatus::*;

// ============================================================================
// Purchases
// ============================================================================

#[tokio::test]
async fn test_purchase_toggling() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 100, None).await;

    let row = fx
        .engine
        .record_purchase(&fx.owner, purchase(gula, 50, Pending))
        .await
        .unwrap();
    assert_eq!(fx.quantity(gula).await, 100);

    fx.engine
        .update_purchase(&fx.owner, row.id, purchase(gula, 50, Completed))
        .await
        .unwrap();
    assert_eq!(fx.quantity(gula).await, 150);

    fx.engine
        .update_purchase(&fx.owner, row.id, purchase(gula, 50, Cancelled))
        .await
        .unwrap();
    assert_eq!(fx.quantity(gula).await, 100);

    fx.engine
        .update_purchase(&fx.owner, row.id, purchase(gula, 50, Completed))
        .await
        .unwrap();
    fx.engine.delete_purchase(&fx.owner, row.id).await.unwrap();
    assert_eq!(fx.quantity(gula).await, 100);
    assert!(fx.store.stock_ins().await.is_empty());
}

#[tokio::test]
async fn test_completed_purchase_adds_stock() {
    let fx = Fixture::new();
    let kopi = fx.product("Kopi", 0, None).await;

    let row = fx
        .engine
        .record_purchase(&fx.owner, purchase(kopi, 1000, Completed))
        .await
        .unwrap();
    assert_eq!(row.status, Completed);
    assert_eq!(fx.quantity(kopi).await, 1000);
    assert_eq!(fx.store.stock_ins().await.len(), 1);
}

#[tokio::test]
async fn test_purchase_moved_to_another_product() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 0, None).await;
    let susu = fx.product("Susu", 0, None).await;

    let row = fx
        .engine
        .record_purchase(&fx.owner, purchase(gula, 40, Completed))
        .await
        .unwrap();
    fx.engine
        .update_purchase(&fx.owner, row.id, purchase(susu, 40, Completed))
        .await
        .unwrap();

    assert_eq!(fx.quantity(gula).await, 0);
    assert_eq!(fx.quantity(susu).await, 40);
}

#[tokio::test]
async fn test_purchase_reversal_respects_stock_floor() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 0, None).await;

    let row = fx
        .engine
        .record_purchase(&fx.owner, purchase(gula, 50, Completed))
        .await
        .unwrap();
    fx.engine
        .record_manual_sale(&fx.owner, manual_sale(gula, 30))
        .await
        .unwrap();

    // Only 20 left, taking back 50 would go negative
    let err = fx
        .engine
        .update_purchase(&fx.owner, row.id, purchase(gula, 50, Cancelled))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { available: 20, requested: 50, .. }));
    assert_eq!(fx.quantity(gula).await, 20);

    let err = fx.engine.delete_purchase(&fx.owner, row.id).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
    assert_eq!(fx.store.stock_ins().await[0].status, Completed);
}

#[tokio::test]
async fn test_purchase_validation() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 0, None).await;

    let mut input = purchase(gula, -1, Completed);
    assert!(matches!(
        fx.engine.record_purchase(&fx.owner, input.clone()).await,
        Err(AppError::Validation { .. })
    ));

    input.quantity = 10;
    input.payment_method = "  ".to_string();
    assert!(fx.engine.record_purchase(&fx.owner, input).await.is_err());

    let missing = purchase(Uuid::new_v4(), 10, Completed);
    assert!(matches!(
        fx.engine.record_purchase(&fx.owner, missing).await,
        Err(AppError::NotFound(_))
    ));
    assert!(fx.store.stock_ins().await.is_empty());
}

// ============================================================================
// Manual sales
// ============================================================================

#[tokio::test]
async fn test_manual_sale_reversal() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 10, None).await;

    let sale = fx
        .engine
        .record_manual_sale(&fx.owner, manual_sale(gula, 3))
        .await
        .unwrap();
    assert_eq!(fx.quantity(gula).await, 7);
    assert_eq!(sale.source, StockOutSource::Manual);

    fx.engine
        .update_manual_sale(&fx.owner, sale.id, manual_sale(gula, 5))
        .await
        .unwrap();
    assert_eq!(fx.quantity(gula).await, 5);

    fx.engine
        .update_manual_sale(&fx.owner, sale.id, manual_sale(gula, 3))
        .await
        .unwrap();
    assert_eq!(fx.quantity(gula).await, 7);

    fx.engine.delete_manual_sale(&fx.owner, sale.id).await.unwrap();
    assert_eq!(fx.quantity(gula).await, 10);
    assert!(fx.store.stock_outs().await.is_empty());
}

#[tokio::test]
async fn test_manual_sale_update_may_use_restored_stock() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 10, None).await;

    let sale = fx
        .engine
        .record_manual_sale(&fx.owner, manual_sale(gula, 10))
        .await
        .unwrap();
    assert_eq!(fx.quantity(gula).await, 0);

    // Restoring 10 then deducting 10 nets to zero
    fx.engine
        .update_manual_sale(&fx.owner, sale.id, manual_sale(gula, 10))
        .await
        .unwrap();
    assert_eq!(fx.quantity(gula).await, 0);

    let err = fx
        .engine
        .update_manual_sale(&fx.owner, sale.id, manual_sale(gula, 11))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
}

#[tokio::test]
async fn test_sale_cannot_overdraw() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 5, None).await;

    let err = fx
        .engine
        .record_manual_sale(&fx.owner, manual_sale(gula, 6))
        .await
        .unwrap_err();
    match err {
        AppError::InsufficientStock {
            product,
            available,
            requested,
        } => {
            assert_eq!(product, "Gula");
            assert_eq!(available, 5);
            assert_eq!(requested, 6);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fx.quantity(gula).await, 5);
    assert!(fx.store.stock_outs().await.is_empty());
}

#[tokio::test]
async fn test_zero_quantity_sale_is_rejected() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 5, None).await;
    assert!(matches!(
        fx.engine.record_manual_sale(&fx.owner, manual_sale(gula, 0)).await,
        Err(AppError::Validation { .. })
    ));
}

// ============================================================================
// Recipe sales
// ============================================================================

#[tokio::test]
async fn test_sell_menu_deducts_recipe() {
    let fx = Fixture::new();
    let kopi = fx.product("Kopi", 100, None).await;
    let susu = fx.product("Susu", 1000, None).await;
    let menu = fx.menu("KS1", "Kopi Susu", &[(kopi, "15"), (susu, "120")]).await;

    let outcome = fx
        .engine
        .sell_menu(
            &fx.owner,
            MenuSaleInput {
                menu_id: menu,
                portions: 2,
                transaction_date: None,
                note: Some("Meja 4".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(fx.quantity(kopi).await, 70);
    assert_eq!(fx.quantity(susu).await, 760);
    assert_eq!(outcome.rows.len(), 2);
    assert!(outcome.rows.iter().all(|r| r.batch_id == Some(outcome.batch_id)
        && r.source == StockOutSource::RecipeSale
        && r.menu_id == Some(menu)));
    assert!(outcome.rows.iter().any(|r| r.name == "Kopi Susu x2 - Kopi"));
}

#[tokio::test]
async fn test_menu_without_recipe_cannot_be_sold() {
    let fx = Fixture::new();
    let menu = fx.menu("AIR", "Air Putih", &[]).await;

    let err = fx
        .engine
        .sell_menu(
            &fx.owner,
            MenuSaleInput {
                menu_id: menu,
                portions: 1,
                transaction_date: None,
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn test_menu_sale_is_all_or_nothing() {
    let fx = Fixture::new();
    let kopi = fx.product("Kopi", 100, None).await;
    let susu = fx.product("Susu", 50, None).await;
    let menu = fx.menu("KS1", "Kopi Susu", &[(kopi, "15"), (susu, "120")]).await;

    let err = fx
        .engine
        .sell_menu(
            &fx.owner,
            MenuSaleInput {
                menu_id: menu,
                portions: 1,
                transaction_date: None,
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
    assert_eq!(fx.quantity(kopi).await, 100);
    assert!(fx.store.stock_outs().await.is_empty());
}

#[tokio::test]
async fn test_batch_rows_cannot_be_edited_individually() {
    let fx = Fixture::new();
    let kopi = fx.product("Kopi", 100, None).await;
    let menu = fx.menu("K1", "Kopi Hitam", &[(kopi, "10")]).await;

    let outcome = fx
        .engine
        .sell_menu(
            &fx.owner,
            MenuSaleInput {
                menu_id: menu,
                portions: 1,
                transaction_date: None,
                note: None,
            },
        )
        .await
        .unwrap();
    let row_id = outcome.rows[0].id;

    assert!(matches!(
        fx.engine
            .update_manual_sale(&fx.owner, row_id, manual_sale(kopi, 1))
            .await,
        Err(AppError::Conflict { .. })
    ));
    assert!(matches!(
        fx.engine.delete_manual_sale(&fx.owner, row_id).await,
        Err(AppError::Conflict { .. })
    ));
    assert_eq!(fx.quantity(kopi).await, 90);
}

// ============================================================================
// Quantity limits
// ============================================================================

#[tokio::test]
async fn test_oversized_quantities_are_rejected() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 100, None).await;

    let huge = PurchaseInput {
        quantity: i64::MAX,
        total_amount: 0,
        ..purchase(gula, 1, Completed)
    };
    assert!(matches!(
        fx.engine.record_purchase(&fx.owner, huge).await,
        Err(AppError::Validation { ref field, .. }) if field == "quantity"
    ));
    assert!(matches!(
        fx.engine.record_manual_sale(&fx.owner, manual_sale(gula, i64::MAX)).await,
        Err(AppError::Validation { ref field, .. }) if field == "quantity"
    ));
    assert_eq!(fx.quantity(gula).await, 100);
    assert!(fx.store.stock_ins().await.is_empty());
}

#[tokio::test]
async fn test_stock_near_the_ceiling_cannot_wrap() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", i64::MAX - 5, None).await;

    let err = fx
        .engine
        .record_purchase(&fx.owner, purchase(gula, 10, Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));
    assert_eq!(fx.quantity(gula).await, i64::MAX - 5);
}

#[tokio::test]
async fn test_menu_sale_overflowing_recipe_is_rejected() {
    let fx = Fixture::new();
    let kopi = fx.product("Kopi", 100, None).await;
    let menu = fx.menu("BIG", "Kopi Drum", &[(kopi, "1000000000000")]).await;

    let err = fx
        .engine
        .sell_menu(
            &fx.owner,
            MenuSaleInput {
                menu_id: menu,
                portions: 1_000_000_000,
                transaction_date: None,
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "portions"));
    assert_eq!(fx.quantity(kopi).await, 100);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sales_never_overdraw() {
    let fx = Fixture::new();
    let gula = fx.product("Gula", 10, None).await;

    let mut handles = Vec::new();
    for _ in 0..25 {
        let engine = fx.engine.clone();
        let owner = fx.owner.clone();
        handles.push(tokio::spawn(async move {
            engine.record_manual_sale(&owner, manual_sale(gula, 1)).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::InsufficientStock { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(fx.quantity(gula).await, 0);
    assert_eq!(fx.store.stock_outs().await.len(), 10);
}

// ============================================================================
// Property Tests
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Purchase(i64, PurchaseStatus),
    Sale(i64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..50, prop_oneof![Just(Pending), Just(Completed), Just(Cancelled)])
            .prop_map(|(q, s)| Op::Purchase(q, s)),
        (1i64..40).prop_map(Op::Sale),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Quantity never drops below zero and always equals completed
    /// purchases minus recorded sales
    #[test]
    fn prop_quantity_matches_ledger(start in 0i64..50, ops in prop::collection::vec(op_strategy(), 1..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let fx = Fixture::new();
            let gula = fx.product("Gula", start, None).await;

            for op in ops {
                match op {
                    Op::Purchase(q, s) => {
                        fx.engine.record_purchase(&fx.owner, purchase(gula, q, s)).await.unwrap();
                    }
                    Op::Sale(q) => {
                        let _ = fx.engine.record_manual_sale(&fx.owner, manual_sale(gula, q)).await;
                    }
                }
                prop_assert!(fx.quantity(gula).await >= 0);
            }

            let completed: i64 = fx
                .store
                .stock_ins()
                .await
                .iter()
                .filter(|p| p.status == Completed)
                .map(|p| p.quantity)
                .sum();
            let sold: i64 = fx.store.stock_outs().await.iter().map(|s| s.quantity).sum();
            prop_assert_eq!(fx.quantity(gula).await, start + completed - sold);
            Ok(())
        })?;
    }
}
