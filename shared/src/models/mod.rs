//! Domain models for the Kedai inventory back-office

mod menu;
mod notification;
mod product;
mod purchase;
mod sale;
mod supplier;
mod user;

pub use menu::*;
pub use notification::*;
pub use product::*;
pub use purchase::*;
pub use sale::*;
pub use supplier::*;
pub use user::*;
