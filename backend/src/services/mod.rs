//! Business logic services for the Kedai inventory back-office

pub mod auth;
pub mod dashboard;
pub mod ledger;
pub mod menus;
pub mod notification;
pub mod products;
pub mod sales_csv;
pub mod stock;
pub mod suppliers;
pub mod users;

pub use auth::AuthService;
pub use dashboard::DashboardService;
pub use ledger::LedgerService;
pub use menus::MenuService;
pub use notification::LowStockNotifier;
pub use products::ProductService;
pub use stock::StockAdjustmentEngine;
pub use suppliers::SupplierService;
pub use users::UserService;
