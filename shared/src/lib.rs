//! Shared types and models for the Kedai inventory back-office
//!
//! This crate contains the domain model and the pure stock rules shared
//! between the backend and the dashboard (via WASM).

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
