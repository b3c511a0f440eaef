//! PostgreSQL store
//!
//! Each unit of work is one database transaction. Balance writes are
//! compare-and-set on the `version` column so that a concurrent writer
//! surfaces as `StoreError::Conflict` instead of a lost update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{to_money_scale, Account, LedgerEntry, NewAccount, NewLedgerEntry};

use super::{AccountStore, LedgerStore, Store, StoreError, StoreResult, UnitOfWork};

const ACCOUNT_COLUMNS: &str = "id, username, email, password, first_name, last_name, phone_number, balance, version";

const ENTRY_COLUMNS: &str =
    "id, entry_type, amount, balance_after_transaction, description, created_at, customer_id";

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    balance: Decimal,
    version: i64,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            username: row.username,
            email: row.email,
            password: row.password,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: row.phone_number,
            // NUMERIC zero decodes at scale 0
            balance: to_money_scale(row.balance),
            version: row.version,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: i64,
    entry_type: String,
    amount: Decimal,
    balance_after_transaction: Decimal,
    description: String,
    created_at: DateTime<Utc>,
    customer_id: i64,
}

impl TryFrom<EntryRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: row.id,
            entry_type: row.entry_type.parse().map_err(StoreError::InvalidData)?,
            amount: to_money_scale(row.amount),
            balance_after_transaction: to_money_scale(row.balance_after_transaction),
            description: row.description,
            timestamp: row.created_at,
            customer_id: row.customer_id,
        })
    }
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    type Work = PgWork;

    async fn begin(&self) -> StoreResult<PgWork> {
        let tx = self.pool.begin().await?;
        Ok(PgWork { tx })
    }
}

/// A unit of work bound to one open transaction
pub struct PgWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountStore for PgWork {
    async fn find_account(&mut self, id: i64) -> StoreResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customers WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn find_account_by_username(&mut self, username: &str) -> StoreResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {} FROM customers WHERE username = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Account::from))
    }

    async fn username_exists(&mut self, username: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE username = $1)")
                .bind(username)
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(exists)
    }

    async fn email_exists(&mut self, email: &str) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM customers WHERE email = $1)")
                .bind(email)
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(exists)
    }

    async fn insert_account(&mut self, account: &NewAccount) -> StoreResult<Account> {
        let row: AccountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO customers (username, email, password, first_name, last_name, phone_number, balance)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone_number)
        .bind(account.balance.value())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn update_account(&mut self, account: &Account) -> StoreResult<Account> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            r#"
            UPDATE customers
            SET
                email = $2,
                password = $3,
                first_name = $4,
                last_name = $5,
                phone_number = $6,
                balance = $7,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $8
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone_number)
        .bind(account.balance)
        .bind(account.version)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(Account::from).ok_or(StoreError::Conflict)
    }
}

#[async_trait]
impl LedgerStore for PgWork {
    async fn find_entry(&mut self, id: i64) -> StoreResult<Option<LedgerEntry>> {
        let row: Option<EntryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE id = $1",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(LedgerEntry::try_from).transpose()
    }

    async fn entries_for_account(&mut self, customer_id: i64) -> StoreResult<Vec<LedgerEntry>> {
        let rows: Vec<EntryRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE customer_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
            ENTRY_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    async fn insert_entry(&mut self, entry: &NewLedgerEntry) -> StoreResult<LedgerEntry> {
        let row: EntryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO transactions (entry_type, amount, balance_after_transaction, description, created_at, customer_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(entry.entry_type.as_str())
        .bind(entry.amount.value())
        .bind(entry.balance_after.value())
        .bind(&entry.description)
        .bind(entry.timestamp)
        .bind(entry.customer_id)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }
}

#[async_trait]
impl UnitOfWork for PgWork {
    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
