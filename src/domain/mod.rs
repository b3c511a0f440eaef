//! Domain module
//!
//! Core domain types and business errors.

pub mod account;
pub mod amount;
pub mod context;
pub mod error;
pub mod ledger;
pub mod passbook;

pub use account::{Account, FieldTooLong, NewAccount};
pub use amount::{to_money_scale, Amount, AmountError, Balance, MONEY_SCALE};
pub use context::OperationContext;
pub use error::{BankError, BankResult};
pub use ledger::{EntryType, LedgerEntry, NewLedgerEntry};
pub use passbook::{EntrySummary, Passbook};
