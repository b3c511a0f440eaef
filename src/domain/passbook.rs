//! Passbook view
//!
//! Read-only summary combining an account's live state with its ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Account, LedgerEntry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passbook {
    pub customer_id: i64,
    pub customer_name: String,
    /// Live account balance, not the last entry's running balance
    pub current_balance: Decimal,
    pub total_transactions: usize,
    pub transactions: Vec<EntrySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: i64,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub amount: Decimal,
    pub balance_after_transaction: Decimal,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl From<LedgerEntry> for EntrySummary {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            entry_type: entry.entry_type.to_string(),
            amount: entry.amount,
            balance_after_transaction: entry.balance_after_transaction,
            description: entry.description,
            timestamp: entry.timestamp,
        }
    }
}

impl Passbook {
    /// Build a passbook from an account and its history, already newest first
    pub fn new(account: &Account, history: Vec<LedgerEntry>) -> Self {
        let transactions: Vec<EntrySummary> = history.into_iter().map(Into::into).collect();

        Self {
            customer_id: account.id,
            customer_name: account.full_name(),
            current_balance: account.balance,
            total_transactions: transactions.len(),
            transactions,
        }
    }
}
