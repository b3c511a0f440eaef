//! Account Directory
//!
//! Registration, lookup and credential checks over the Account Store. This
//! is the only component that writes account rows, balances included.

use crate::domain::{Account, Balance, BankError, BankResult, NewAccount};
use crate::store::{AccountStore, Store, StoreError, UniqueField, UnitOfWork};

use super::RegisterCommand;

#[derive(Debug, Clone)]
pub struct AccountDirectory<S> {
    store: S,
}

impl<S: Store> AccountDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Register a new customer
    ///
    /// Field lengths are checked against the column widths before touching
    /// the store. Usernames and emails are checked up front for a friendly
    /// error; the store's unique constraints catch registrations racing past
    /// the check.
    pub async fn register(&self, command: RegisterCommand) -> BankResult<Account> {
        let balance = match command.opening_balance {
            Some(value) => Balance::new(value)?,
            None => Balance::zero(),
        };

        let candidate = NewAccount {
            username: command.username,
            email: command.email,
            password: command.password,
            first_name: command.first_name,
            last_name: command.last_name,
            phone_number: command.phone_number,
            balance,
        };
        candidate.check_lengths()?;

        let mut work = self.store.begin().await?;

        if work.username_exists(&candidate.username).await? {
            return Err(BankError::DuplicateUsername(candidate.username));
        }
        if work.email_exists(&candidate.email).await? {
            return Err(BankError::DuplicateEmail(candidate.email));
        }

        let account = work
            .insert_account(&candidate)
            .await
            .map_err(|e| duplicate_error(e, &candidate))?;
        work.commit()
            .await
            .map_err(|e| duplicate_error(e, &candidate))?;

        tracing::info!(
            customer_id = account.id,
            username = %account.username,
            "Customer registered"
        );

        Ok(account)
    }

    /// Check a username/password pair
    pub async fn authenticate(&self, username: &str, password: &str) -> BankResult<Account> {
        let mut work = self.store.begin().await?;

        match work.find_account_by_username(username).await? {
            Some(account) if account.password_matches(password) => Ok(account),
            _ => {
                tracing::warn!(username = %username, "Login rejected");
                Err(BankError::InvalidCredentials)
            }
        }
    }

    pub async fn get_by_id(&self, id: i64) -> BankResult<Account> {
        let mut work = self.store.begin().await?;
        self.load(&mut work, id).await
    }

    pub async fn get_by_username(&self, username: &str) -> BankResult<Account> {
        let mut work = self.store.begin().await?;

        work.find_account_by_username(username)
            .await?
            .ok_or_else(|| BankError::username_not_found(username))
    }

    /// Load an account inside an existing unit of work
    pub async fn load<W: AccountStore>(&self, work: &mut W, id: i64) -> BankResult<Account> {
        work.find_account(id)
            .await?
            .ok_or_else(|| BankError::account_id_not_found(id))
    }

    /// Write an account's in-memory state back inside an existing unit of work
    ///
    /// Refuses to store a negative balance. Returns the account as stored.
    pub async fn persist_balance<W: AccountStore>(
        &self,
        work: &mut W,
        account: &Account,
    ) -> BankResult<Account> {
        account.current_balance()?;
        Ok(work.update_account(account).await?)
    }
}

fn duplicate_error(err: StoreError, candidate: &NewAccount) -> BankError {
    match err {
        StoreError::UniqueViolation(UniqueField::Username) => {
            BankError::DuplicateUsername(candidate.username.clone())
        }
        StoreError::UniqueViolation(UniqueField::Email) => {
            BankError::DuplicateEmail(candidate.email.clone())
        }
        other => other.into(),
    }
}
