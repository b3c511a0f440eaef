//! Domain Error Types
//!
//! Business rule failures raised by the Account Directory and the
//! Money-Movement Engine. None of them is fatal; each one is reported back
//! to the caller as-is.

use rust_decimal::Decimal;
use thiserror::Error;

use super::{AmountError, FieldTooLong};
use crate::store::{StoreError, UniqueField};

/// Result alias used by the service layer
pub type BankResult<T> = Result<T, BankError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BankError {
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    /// Unknown username and wrong password are deliberately indistinguishable
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Customer not found with {0}")]
    AccountNotFound(String),

    #[error("Transaction not found with id: {0}")]
    EntryNotFound(i64),

    #[error("{0}")]
    InvalidAmount(String),

    /// Registration data the store cannot accept
    #[error("{0}")]
    InvalidCustomerData(String),

    #[error("Insufficient balance. Available balance: {available}")]
    InsufficientFunds { available: Decimal },

    #[error("Cannot transfer money to the same account")]
    SameAccount,

    /// Optimistic concurrency retries were exhausted
    #[error("Concurrent modification detected, please retry")]
    Conflict,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl BankError {
    pub fn account_id_not_found(id: i64) -> Self {
        Self::AccountNotFound(format!("id: {}", id))
    }

    pub fn username_not_found(username: &str) -> Self {
        Self::AccountNotFound(format!("username: {}", username))
    }

    pub fn insufficient_funds(available: Decimal) -> Self {
        Self::InsufficientFunds { available }
    }

    /// Check if this is a client error (caller's input or business rule)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Conflict | Self::StoreUnavailable(_))
    }
}

impl From<AmountError> for BankError {
    fn from(err: AmountError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

impl From<FieldTooLong> for BankError {
    fn from(err: FieldTooLong) -> Self {
        Self::InvalidCustomerData(err.to_string())
    }
}

impl From<StoreError> for BankError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            // Callers that can name the offending value map this themselves
            StoreError::UniqueViolation(UniqueField::Username) => {
                Self::DuplicateUsername(String::new())
            }
            StoreError::UniqueViolation(UniqueField::Email) => Self::DuplicateEmail(String::new()),
            StoreError::Rejected(reason) => Self::InvalidCustomerData(reason),
            other => Self::StoreUnavailable(other.to_string()),
        }
    }
}
