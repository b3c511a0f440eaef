//! Command definitions
//!
//! Commands represent intentions to change the system state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =========================================================================
// RegisterCommand
// =========================================================================

/// Command to register a new customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    /// Opening balance; zero when absent
    pub opening_balance: Option<Decimal>,
}

impl RegisterCommand {
    pub fn new(
        username: String,
        email: String,
        password: String,
        first_name: String,
        last_name: String,
    ) -> Self {
        Self {
            username,
            email,
            password,
            first_name,
            last_name,
            phone_number: None,
            opening_balance: None,
        }
    }

    pub fn with_phone_number(mut self, phone_number: String) -> Self {
        self.phone_number = Some(phone_number);
        self
    }

    pub fn with_opening_balance(mut self, balance: Decimal) -> Self {
        self.opening_balance = Some(balance);
        self
    }
}

// =========================================================================
// DepositCommand / WithdrawCommand
// =========================================================================

/// Command to credit money to a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositCommand {
    pub customer_id: i64,
    /// Raw amount; validated by the engine
    pub amount: Decimal,
    pub description: Option<String>,
}

impl DepositCommand {
    pub fn new(customer_id: i64, amount: Decimal) -> Self {
        Self {
            customer_id,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }
}

/// Command to debit money from a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawCommand {
    pub customer_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
}

impl WithdrawCommand {
    pub fn new(customer_id: i64, amount: Decimal) -> Self {
        Self {
            customer_id,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }
}

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move money between two customers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub from_customer_id: i64,
    pub to_customer_id: i64,
    pub amount: Decimal,
    /// Optional memo appended to both generated descriptions
    pub description: Option<String>,
}

impl TransferCommand {
    pub fn new(from_customer_id: i64, to_customer_id: i64, amount: Decimal) -> Self {
        Self {
            from_customer_id,
            to_customer_id,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }
}
