//! Ledger entries
//!
//! Immutable records of balance-affecting events, one per deposit or
//! withdrawal and two per transfer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Amount, Balance};

const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Money deposited";
const DEFAULT_WITHDRAWAL_DESCRIPTION: &str = "Money withdrawn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Deposit,
    Withdrawal,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            other => Err(format!("unknown entry type: {}", other)),
        }
    }
}

/// A stored ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub balance_after_transaction: Decimal,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub customer_id: i64,
}

/// A ledger entry awaiting insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub customer_id: i64,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub balance_after: Balance,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl NewLedgerEntry {
    pub fn deposit(
        customer_id: i64,
        amount: Amount,
        balance_after: Balance,
        description: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            entry_type: EntryType::Deposit,
            amount,
            balance_after,
            description: description.unwrap_or_else(|| DEFAULT_DEPOSIT_DESCRIPTION.to_string()),
            timestamp,
        }
    }

    pub fn withdrawal(
        customer_id: i64,
        amount: Amount,
        balance_after: Balance,
        description: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_id,
            entry_type: EntryType::Withdrawal,
            amount,
            balance_after,
            description: description
                .unwrap_or_else(|| DEFAULT_WITHDRAWAL_DESCRIPTION.to_string()),
            timestamp,
        }
    }

    /// Attach the store-assigned identity
    pub fn into_entry(self, id: i64) -> LedgerEntry {
        LedgerEntry {
            id,
            entry_type: self.entry_type,
            amount: self.amount.value(),
            balance_after_transaction: self.balance_after.value(),
            description: self.description,
            timestamp: self.timestamp,
            customer_id: self.customer_id,
        }
    }
}

/// Description for one side of a transfer: `"Transfer to Jane Doe - rent"`
pub fn transfer_description(direction: &str, counterparty: &str, memo: Option<&str>) -> String {
    match memo {
        Some(memo) => format!("Transfer {} {} - {}", direction, counterparty, memo),
        None => format!("Transfer {} {}", direction, counterparty),
    }
}

/// Display order: newest first, later insertions first within one instant
pub fn sort_newest_first(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}
