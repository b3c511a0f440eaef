//! Money-Movement Engine
//!
//! Deposits, withdrawals and transfers. Each operation runs in a single unit
//! of work: the balance writes and the ledger entries commit together or
//! not at all. Balances are read and written through the Account Directory.

use chrono::Utc;
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;

use crate::domain::ledger::transfer_description;
use crate::domain::{
    Amount, AmountError, BankError, BankResult, LedgerEntry, NewLedgerEntry, OperationContext,
    Passbook,
};
use crate::store::{LedgerStore, Store, UnitOfWork};

use super::{AccountDirectory, DepositCommand, TransferCommand, WithdrawCommand};

/// Attempts per operation when a concurrent writer wins the race
pub(crate) const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct MoneyMovement<S> {
    store: S,
    directory: AccountDirectory<S>,
}

impl<S: Store> MoneyMovement<S> {
    pub fn new(store: S) -> Self {
        Self {
            directory: AccountDirectory::new(store.clone()),
            store,
        }
    }

    pub fn directory(&self) -> &AccountDirectory<S> {
        &self.directory
    }

    // =========================================================================
    // Deposit
    // =========================================================================

    pub async fn deposit(
        &self,
        command: DepositCommand,
        context: &OperationContext,
    ) -> BankResult<LedgerEntry> {
        let amount = positive_amount("Deposit", command.amount)?;
        let customer_id = command.customer_id;
        let description = command.description.as_deref();

        let entry = retry_on_conflict("deposit", move || {
            self.try_deposit(customer_id, amount, description)
        })
        .await?;

        tracing::info!(
            customer_id,
            amount = %amount,
            balance = %entry.balance_after_transaction,
            correlation_id = ?context.correlation_id,
            "Deposit completed"
        );

        Ok(entry)
    }

    async fn try_deposit(
        &self,
        customer_id: i64,
        amount: Amount,
        description: Option<&str>,
    ) -> BankResult<LedgerEntry> {
        let mut work = self.store.begin().await?;

        let mut account = self.directory.load(&mut work, customer_id).await?;
        let new_balance = account.current_balance()?.credit(&amount)?;
        account.balance = new_balance.value();
        let account = self.directory.persist_balance(&mut work, &account).await?;

        let entry = work
            .insert_entry(&NewLedgerEntry::deposit(
                account.id,
                amount,
                new_balance,
                description.map(str::to_owned),
                Utc::now(),
            ))
            .await?;

        work.commit().await?;
        Ok(entry)
    }

    // =========================================================================
    // Withdraw
    // =========================================================================

    pub async fn withdraw(
        &self,
        command: WithdrawCommand,
        context: &OperationContext,
    ) -> BankResult<LedgerEntry> {
        let amount = positive_amount("Withdrawal", command.amount)?;
        let customer_id = command.customer_id;
        let description = command.description.as_deref();

        let entry = retry_on_conflict("withdraw", move || {
            self.try_withdraw(customer_id, amount, description)
        })
        .await?;

        tracing::info!(
            customer_id,
            amount = %amount,
            balance = %entry.balance_after_transaction,
            correlation_id = ?context.correlation_id,
            "Withdrawal completed"
        );

        Ok(entry)
    }

    async fn try_withdraw(
        &self,
        customer_id: i64,
        amount: Amount,
        description: Option<&str>,
    ) -> BankResult<LedgerEntry> {
        let mut work = self.store.begin().await?;

        let mut account = self.directory.load(&mut work, customer_id).await?;
        let balance = account.current_balance()?;
        if !balance.is_sufficient_for(&amount) {
            return Err(BankError::insufficient_funds(account.balance));
        }

        let new_balance = balance.debit(&amount)?;
        account.balance = new_balance.value();
        let account = self.directory.persist_balance(&mut work, &account).await?;

        let entry = work
            .insert_entry(&NewLedgerEntry::withdrawal(
                account.id,
                amount,
                new_balance,
                description.map(str::to_owned),
                Utc::now(),
            ))
            .await?;

        work.commit().await?;
        Ok(entry)
    }

    // =========================================================================
    // Transfer
    // =========================================================================

    /// Move money between two customers, returning `[debit, credit]`
    pub async fn transfer(
        &self,
        command: TransferCommand,
        context: &OperationContext,
    ) -> BankResult<[LedgerEntry; 2]> {
        let amount = positive_amount("Transfer", command.amount)?;
        if command.from_customer_id == command.to_customer_id {
            return Err(BankError::SameAccount);
        }

        let from_id = command.from_customer_id;
        let to_id = command.to_customer_id;
        let memo = command.description.as_deref();

        let entries = retry_on_conflict("transfer", move || {
            self.try_transfer(from_id, to_id, amount, memo)
        })
        .await?;

        tracing::info!(
            from_customer_id = from_id,
            to_customer_id = to_id,
            amount = %amount,
            correlation_id = ?context.correlation_id,
            "Transfer completed"
        );

        Ok(entries)
    }

    async fn try_transfer(
        &self,
        from_id: i64,
        to_id: i64,
        amount: Amount,
        memo: Option<&str>,
    ) -> BankResult<[LedgerEntry; 2]> {
        let mut work = self.store.begin().await?;

        let mut from = self.directory.load(&mut work, from_id).await?;
        let mut to = self.directory.load(&mut work, to_id).await?;

        let from_balance = from.current_balance()?;
        if !from_balance.is_sufficient_for(&amount) {
            return Err(BankError::insufficient_funds(from.balance));
        }

        let from_new = from_balance.debit(&amount)?;
        let to_new = to.current_balance()?.credit(&amount)?;
        from.balance = from_new.value();
        to.balance = to_new.value();

        // Source first, then destination
        let from = self.directory.persist_balance(&mut work, &from).await?;
        let to = self.directory.persist_balance(&mut work, &to).await?;

        let timestamp = Utc::now();
        let debit = work
            .insert_entry(&NewLedgerEntry::withdrawal(
                from.id,
                amount,
                from_new,
                Some(transfer_description("to", &to.full_name(), memo)),
                timestamp,
            ))
            .await?;
        let credit = work
            .insert_entry(&NewLedgerEntry::deposit(
                to.id,
                amount,
                to_new,
                Some(transfer_description("from", &from.full_name(), memo)),
                timestamp,
            ))
            .await?;

        work.commit().await?;
        Ok([debit, credit])
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Ledger of one customer, newest first
    ///
    /// Unknown customers are reported as not found rather than as an empty
    /// history.
    pub async fn history(&self, customer_id: i64) -> BankResult<Vec<LedgerEntry>> {
        let mut work = self.store.begin().await?;

        self.directory.load(&mut work, customer_id).await?;
        Ok(work.entries_for_account(customer_id).await?)
    }

    pub async fn entry(&self, entry_id: i64) -> BankResult<LedgerEntry> {
        let mut work = self.store.begin().await?;

        work.find_entry(entry_id)
            .await?
            .ok_or(BankError::EntryNotFound(entry_id))
    }

    pub async fn passbook(&self, customer_id: i64) -> BankResult<Passbook> {
        let mut work = self.store.begin().await?;

        let account = self.directory.load(&mut work, customer_id).await?;
        let history = work.entries_for_account(customer_id).await?;
        Ok(Passbook::new(&account, history))
    }
}

/// Validate a requested amount, naming the operation when it is not positive
fn positive_amount(operation: &str, value: Decimal) -> BankResult<Amount> {
    Amount::new(value).map_err(|err| match err {
        AmountError::NotPositive(_) => BankError::InvalidAmount(format!(
            "{} amount must be greater than zero",
            operation
        )),
        other => other.into(),
    })
}

/// Run `attempt` until it stops failing with `BankError::Conflict`
async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut attempt: F) -> BankResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BankResult<T>>,
{
    for n in 1..=MAX_ATTEMPTS {
        match attempt().await {
            Err(BankError::Conflict) if n < MAX_ATTEMPTS => {
                tracing::warn!(
                    operation,
                    "Concurrency conflict, retrying (attempt {}/{})",
                    n,
                    MAX_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_millis(50 * n as u64)).await;
            }
            result => return result,
        }
    }

    Err(BankError::Conflict)
}
