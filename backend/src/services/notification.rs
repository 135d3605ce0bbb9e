//! Low stock notifications
//!
//! Notifications are derived on read. Each call classifies the scope's
//! products and reconciles the stored rows:
//! - an alerting product keeps its open row for the same status, or gets a new one
//! - an open row whose message template output changed is refreshed
//! - an open row whose product no longer has that status is resolved
//!
//! At most one open row exists per owner, product and status.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::models::{low_stock_message, LowStockAlert, Notification, Product, Severity};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::StockStore;
use crate::tenancy::{OwnerScope, TenancyResolver};

/// Changes needed to bring stored notifications in line with stock levels
#[derive(Debug, Default, PartialEq)]
pub struct NotificationPlan {
    pub create: Vec<Notification>,
    /// Open rows whose message changed: (notification id, new message)
    pub refresh: Vec<(Uuid, String)>,
    /// Open rows whose condition cleared
    pub resolve: Vec<Uuid>,
    /// Alerts to return, newest first
    pub alerts: Vec<LowStockAlert>,
}

impl NotificationPlan {
    pub fn is_noop(&self) -> bool {
        self.create.is_empty() && self.refresh.is_empty() && self.resolve.is_empty()
    }
}

/// Reconcile `products` against the owner's `open` notifications
pub fn plan_notifications(
    owner_id: Uuid,
    products: &[Product],
    open: &[Notification],
    now: DateTime<Utc>,
) -> NotificationPlan {
    let mut plan = NotificationPlan::default();
    let mut kept: HashSet<Uuid> = HashSet::new();

    for product in products {
        let status = product.stock_status();
        let (Some(message), Some(severity)) = (
            low_stock_message(&product.name, status),
            Severity::for_status(status),
        ) else {
            continue;
        };

        let existing = open
            .iter()
            .find(|n| n.product_id == product.id && n.status == status);

        let (notification_id, notified_at) = match existing {
            Some(n) => {
                kept.insert(n.id);
                if n.message != message {
                    plan.refresh.push((n.id, message.clone()));
                }
                (n.id, n.notified_at)
            }
            None => {
                let notification = Notification {
                    id: Uuid::new_v4(),
                    owner_id,
                    product_id: product.id,
                    status,
                    message: message.clone(),
                    severity,
                    notified_at: now,
                    resolved_at: None,
                };
                let key = (notification.id, notification.notified_at);
                plan.create.push(notification);
                key
            }
        };

        plan.alerts.push(LowStockAlert {
            notification_id,
            product_id: product.id,
            product_name: product.name.clone(),
            quantity: product.quantity,
            low_stock_threshold: product.low_stock_threshold,
            status,
            severity,
            message,
            notified_at,
        });
    }

    plan.resolve = open
        .iter()
        .filter(|n| !kept.contains(&n.id))
        .map(|n| n.id)
        .collect();

    sort_alerts(&mut plan.alerts);
    plan
}

fn sort_alerts(alerts: &mut [LowStockAlert]) {
    alerts.sort_by(|a, b| {
        b.notified_at
            .cmp(&a.notified_at)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
}

/// Point the alert planned as `planned_id` at the row the store kept.
/// Returns whether anything changed.
pub fn adopt_stored(alerts: &mut [LowStockAlert], planned_id: Uuid, stored: &Notification) -> bool {
    if stored.id == planned_id {
        return false;
    }
    match alerts.iter_mut().find(|a| a.notification_id == planned_id) {
        Some(alert) => {
            alert.notification_id = stored.id;
            alert.notified_at = stored.notified_at;
            true
        }
        None => false,
    }
}

/// Derives and stores low stock alerts for the caller's scope
pub struct LowStockNotifier {
    store: Arc<dyn StockStore>,
    tenancy: Arc<dyn TenancyResolver>,
    timeout: Duration,
}

impl LowStockNotifier {
    pub fn new(
        store: Arc<dyn StockStore>,
        tenancy: Arc<dyn TenancyResolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            tenancy,
            timeout,
        }
    }

    /// Current alerts, newest first. Stored rows are reconciled in the same
    /// unit of work, so repeated calls without stock changes write nothing.
    #[tracing::instrument(name = "notifications.current_alerts", skip_all, fields(user_id = %user.user_id))]
    pub async fn current_alerts(&self, user: &AuthUser) -> AppResult<Vec<LowStockAlert>> {
        let scope = self.tenancy.resolve(user)?;

        tokio::time::timeout(self.timeout, self.reconcile(&scope))
            .await
            .map_err(|_| AppError::Timeout("Loading notifications".to_string()))?
    }

    async fn reconcile(&self, scope: &OwnerScope) -> AppResult<Vec<LowStockAlert>> {
        let mut tx = self.store.begin(self.timeout).await?;
        let products = tx.scope_products(scope).await?;
        let open = tx.unresolved_notifications(scope.owner_id).await?;

        let plan = plan_notifications(scope.owner_id, &products, &open, Utc::now());
        if plan.is_noop() {
            return Ok(plan.alerts);
        }
        let NotificationPlan {
            create,
            refresh,
            resolve,
            mut alerts,
        } = plan;

        let mut adopted = 0;
        for notification in &create {
            let stored = tx.insert_notification(notification).await?;
            if adopt_stored(&mut alerts, notification.id, &stored) {
                adopted += 1;
            }
        }
        for (id, message) in &refresh {
            tx.update_notification_message(*id, message).await?;
        }
        let resolved_at = Utc::now();
        for id in &resolve {
            tx.resolve_notification(*id, resolved_at).await?;
        }
        tx.commit().await?;

        if adopted > 0 {
            sort_alerts(&mut alerts);
        }
        tracing::info!(
            created = create.len() - adopted,
            adopted,
            refreshed = refresh.len(),
            resolved = resolve.len(),
            "low stock notifications reconciled"
        );
        Ok(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use shared::models::{StockStatus, StockUnit};

    fn product(name: &str, quantity: i64, threshold: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: name.to_string(),
            category: "Bahan".to_string(),
            unit: StockUnit::Gram,
            price: 1000,
            quantity,
            low_stock_threshold: threshold,
            supplier_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_alerts_are_created() {
        let now = Utc::now();
        let products = vec![
            product("Gula", 0, Some(100)),
            product("Kopi", 40, Some(100)),
            product("Susu", 80, Some(100)),
            product("Teh", 500, Some(100)),
        ];
        let plan = plan_notifications(Uuid::nil(), &products, &[], now);

        assert_eq!(plan.create.len(), 3);
        assert!(plan.resolve.is_empty());
        let statuses: Vec<StockStatus> = plan.alerts.iter().map(|a| a.status).collect();
        // Same notified_at, so ordered by name
        assert_eq!(
            statuses,
            vec![StockStatus::Out, StockStatus::Critical, StockStatus::Warning]
        );
        assert_eq!(plan.alerts[0].severity, Severity::Critical);
        assert_eq!(plan.alerts[2].severity, Severity::Warning);
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let now = Utc::now();
        let products = vec![product("Gula", 10, Some(100))];
        let first = plan_notifications(Uuid::nil(), &products, &[], now);

        let later = now + ChronoDuration::minutes(5);
        let second = plan_notifications(Uuid::nil(), &products, &first.create, later);
        assert!(second.is_noop());
        assert_eq!(second.alerts[0].notified_at, now);
        assert_eq!(second.alerts[0].notification_id, first.create[0].id);
    }

    #[test]
    fn test_status_change_resolves_old_row() {
        let now = Utc::now();
        let mut gula = product("Gula", 80, Some(100));
        let first = plan_notifications(Uuid::nil(), &[gula.clone()], &[], now);
        assert_eq!(first.create[0].status, StockStatus::Warning);

        gula.quantity = 20;
        let second = plan_notifications(Uuid::nil(), &[gula], &first.create, now);
        assert_eq!(second.create.len(), 1);
        assert_eq!(second.create[0].status, StockStatus::Critical);
        assert_eq!(second.resolve, vec![first.create[0].id]);
    }

    #[test]
    fn test_recovered_product_is_resolved() {
        let now = Utc::now();
        let mut gula = product("Gula", 0, Some(100));
        let first = plan_notifications(Uuid::nil(), &[gula.clone()], &[], now);

        gula.quantity = 1000;
        let second = plan_notifications(Uuid::nil(), &[gula], &first.create, now);
        assert!(second.create.is_empty());
        assert!(second.alerts.is_empty());
        assert_eq!(second.resolve, vec![first.create[0].id]);
    }

    #[test]
    fn test_renamed_product_refreshes_message() {
        let now = Utc::now();
        let mut gula = product("Gula", 10, Some(100));
        let first = plan_notifications(Uuid::nil(), &[gula.clone()], &[], now);

        gula.name = "Gula Aren".to_string();
        let second = plan_notifications(Uuid::nil(), &[gula], &first.create, now);
        assert!(second.create.is_empty());
        assert_eq!(second.refresh.len(), 1);
        assert_eq!(second.refresh[0].1, "Stok Gula Aren kritis, segera lakukan pembelian");
    }

    #[test]
    fn test_products_without_threshold_only_alert_when_empty() {
        let now = Utc::now();
        let products = vec![product("Es Batu", 3, None), product("Sedotan", 0, None)];
        let plan = plan_notifications(Uuid::nil(), &products, &[], now);
        assert_eq!(plan.alerts.len(), 1);
        assert_eq!(plan.alerts[0].product_name, "Sedotan");
    }

    #[test]
    fn test_alerts_sorted_newest_first() {
        let now = Utc::now();
        let gula = product("Gula", 0, Some(100));
        let kopi = product("Kopi", 0, Some(100));
        let old = plan_notifications(Uuid::nil(), &[gula.clone()], &[], now - ChronoDuration::hours(1));
        let plan = plan_notifications(Uuid::nil(), &[gula, kopi], &old.create, now);
        assert_eq!(plan.alerts[0].product_name, "Kopi");
        assert_eq!(plan.alerts[1].product_name, "Gula");
    }

    #[test]
    fn test_alert_adopts_row_stored_by_another_reader() {
        let now = Utc::now();
        let products = vec![product("Gula", 0, Some(100))];
        let mut plan = plan_notifications(Uuid::nil(), &products, &[], now);
        let planned = plan.create[0].clone();

        let earlier = Notification {
            id: Uuid::new_v4(),
            notified_at: now - ChronoDuration::seconds(2),
            ..planned.clone()
        };
        assert!(!adopt_stored(&mut plan.alerts, planned.id, &planned));
        assert!(adopt_stored(&mut plan.alerts, planned.id, &earlier));
        assert_eq!(plan.alerts[0].notification_id, earlier.id);
        assert_eq!(plan.alerts[0].notified_at, earlier.notified_at);
    }
}
