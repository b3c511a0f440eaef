//! Virtual Bank Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod domain;
pub mod handlers;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use api::{build_router, AppState, RouterOptions};
pub use config::Config;
pub use domain::{Account, Amount, AmountError, Balance, BankError, LedgerEntry, OperationContext};
pub use error::{AppError, AppResult};
pub use store::{MemoryStore, PgStore, Store};
