//! Money types
//!
//! Domain primitives for monetary values. Amounts are validated at
//! construction time so that a non-positive deposit, withdrawal or transfer
//! can never reach the store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest value a `NUMERIC(15,2)` column can hold, in hundredths.
const MAX_CENTS: i64 = 999_999_999_999_999;

/// Fixed number of decimal places for every stored monetary value.
pub const MONEY_SCALE: u32 = 2;

fn max_value() -> Decimal {
    Decimal::new(MAX_CENTS, MONEY_SCALE)
}

/// Carry `value` at exactly [`MONEY_SCALE`] decimal places (`0` becomes `0.00`).
pub fn to_money_scale(mut value: Decimal) -> Decimal {
    value.rescale(MONEY_SCALE);
    value
}

/// Amount represents a validated, strictly positive monetary value.
///
/// # Invariants
/// - Value is always positive (> 0)
/// - At most 2 decimal places, always carried at scale 2
/// - Never exceeds the ledger column limit
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use virtual_bank::domain::Amount;
///
/// let amount = Amount::new(Decimal::new(100, 0)).unwrap();
/// assert_eq!(amount.value().to_string(), "100.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

/// Errors that can occur when creating an Amount or Balance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be greater than zero (got {0})")]
    NotPositive(Decimal),

    #[error("Balance cannot be negative (got {0})")]
    Negative(Decimal),

    #[error("Amount has too many decimal places (max {MONEY_SCALE}, got {0})")]
    TooManyDecimals(u32),

    #[error("Amount exceeds maximum allowed value")]
    Overflow,
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    /// - `AmountError::TooManyDecimals` if more than 2 decimal places
    /// - `AmountError::Overflow` if value exceeds the column limit
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive(value));
        }

        let value = value.normalize();
        if value.scale() > MONEY_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        if value > max_value() {
            return Err(AmountError::Overflow);
        }

        Ok(Self(to_money_scale(value)))
    }

    /// Get the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Balance represents an account balance (zero or positive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Balance(Decimal);

impl Balance {
    /// Create a new balance (zero or positive)
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value < Decimal::ZERO {
            return Err(AmountError::Negative(value));
        }

        let value = value.normalize();
        if value.scale() > MONEY_SCALE {
            return Err(AmountError::TooManyDecimals(value.scale()));
        }

        if value > max_value() {
            return Err(AmountError::Overflow);
        }

        Ok(Self(to_money_scale(value)))
    }

    pub fn zero() -> Self {
        Self(to_money_scale(Decimal::ZERO))
    }

    /// Get the underlying value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Check if balance covers a withdrawal of `amount`
    pub fn is_sufficient_for(&self, amount: &Amount) -> bool {
        self.0 >= amount.value()
    }

    /// Add amount to balance
    pub fn credit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 + amount.value())
    }

    /// Subtract amount from balance
    pub fn debit(&self, amount: &Amount) -> Result<Balance, AmountError> {
        Balance::new(self.0 - amount.value())
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::zero()
    }
}
