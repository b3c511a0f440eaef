//! Store module
//!
//! Persistence contracts for the Account Store and the Ledger Store, and
//! the unit of work that makes a set of writes to both commit together.

mod error;
mod memory;
mod postgres;

pub use error::{StoreError, StoreResult, UniqueField};
pub use memory::{MemoryStore, MemoryWork};
pub use postgres::{PgStore, PgWork};

use async_trait::async_trait;

use crate::domain::{Account, LedgerEntry, NewAccount, NewLedgerEntry};

/// Customer records
#[async_trait]
pub trait AccountStore: Send {
    async fn find_account(&mut self, id: i64) -> StoreResult<Option<Account>>;

    async fn find_account_by_username(&mut self, username: &str) -> StoreResult<Option<Account>>;

    async fn username_exists(&mut self, username: &str) -> StoreResult<bool>;

    async fn email_exists(&mut self, email: &str) -> StoreResult<bool>;

    /// Insert a new account and return it with its generated id
    ///
    /// Fails with `StoreError::UniqueViolation` if the username or email is taken.
    async fn insert_account(&mut self, account: &NewAccount) -> StoreResult<Account>;

    /// Write back a previously loaded account
    ///
    /// Succeeds only if the stored version still equals `account.version`;
    /// otherwise fails with `StoreError::Conflict`. Returns the account with
    /// its version advanced.
    async fn update_account(&mut self, account: &Account) -> StoreResult<Account>;
}

/// Append-only transaction log
#[async_trait]
pub trait LedgerStore: Send {
    async fn find_entry(&mut self, id: i64) -> StoreResult<Option<LedgerEntry>>;

    /// All entries owned by an account, newest first
    async fn entries_for_account(&mut self, customer_id: i64) -> StoreResult<Vec<LedgerEntry>>;

    async fn insert_entry(&mut self, entry: &NewLedgerEntry) -> StoreResult<LedgerEntry>;
}

/// One atomic unit of work over both stores
///
/// Dropping a unit of work without calling `commit` discards every write
/// made through it.
#[async_trait]
pub trait UnitOfWork: AccountStore + LedgerStore {
    async fn commit(self) -> StoreResult<()>;
}

/// Factory for units of work
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Work: UnitOfWork;

    async fn begin(&self) -> StoreResult<Self::Work>;
}
