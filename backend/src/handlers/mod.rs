//! HTTP handlers

use shared::models::Role;

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod menus;
pub mod notifications;
pub mod products;
pub mod purchases;
pub mod sales;
pub mod suppliers;
pub mod users;

pub use auth::*;
pub use dashboard::*;
pub use health::*;
pub use menus::*;
pub use notifications::*;
pub use products::*;
pub use purchases::*;
pub use sales::*;
pub use suppliers::*;
pub use users::*;

pub(crate) const OWNER_ONLY: &[Role] = &[Role::Owner];
pub(crate) const OWNER_OR_STAFF: &[Role] = &[Role::Owner, Role::Pegawai];
