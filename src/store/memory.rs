//! In-memory store
//!
//! Process-local implementation of the store contracts. Writes are staged
//! inside the unit of work and validated at commit: updated accounts must
//! still carry the version they were read at, and new usernames and emails
//! must still be free. Used by the test suites and for running the API
//! without a database.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::ledger::sort_newest_first;
use crate::domain::{Account, LedgerEntry, NewAccount, NewLedgerEntry};

use super::{
    AccountStore, LedgerStore, Store, StoreError, StoreResult, UniqueField, UnitOfWork,
};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<i64, Account>,
    entries: BTreeMap<i64, LedgerEntry>,
}

impl Tables {
    fn username_taken(&self, username: &str, except: Option<i64>) -> bool {
        self.accounts
            .values()
            .any(|a| a.username == username && Some(a.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.accounts
            .values()
            .any(|a| a.email == email && Some(a.id) != except)
    }
}

#[derive(Debug)]
struct Shared {
    tables: Mutex<Tables>,
    next_account_id: AtomicI64,
    next_entry_id: AtomicI64,
    fail_writes_after: Mutex<Option<usize>>,
    /// Commits still to be beaten by a simulated concurrent writer
    interfering_commits: Mutex<usize>,
}

/// Store that keeps everything in process memory
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(Tables::default()),
                next_account_id: AtomicI64::new(1),
                next_entry_id: AtomicI64::new(1),
                fail_writes_after: Mutex::new(None),
                interfering_commits: Mutex::new(0),
            }),
        }
    }

    /// Make every unit of work fail on its (n+1)-th write
    pub fn fail_writes_after(&self, writes: usize) {
        *lock(&self.shared.fail_writes_after) = Some(writes);
    }

    pub fn clear_write_failures(&self) {
        *lock(&self.shared.fail_writes_after) = None;
    }

    /// Let a simulated concurrent writer win the next `commits` commits
    ///
    /// Each affected commit finds that every account it read and updated
    /// has moved on by one version, and fails with `StoreError::Conflict`.
    /// Commits that update no existing account are left alone.
    pub fn interfere_with_next_commits(&self, commits: usize) {
        *lock(&self.shared.interfering_commits) = commits;
    }

    /// Committed account, bypassing any unit of work
    pub fn committed_account(&self, id: i64) -> Option<Account> {
        lock(&self.shared.tables).accounts.get(&id).cloned()
    }

    /// Number of committed ledger entries across all accounts
    pub fn committed_entry_count(&self) -> usize {
        lock(&self.shared.tables).entries.len()
    }
}

// A poisoned lock only means another test thread panicked mid-write; the
// tables are still structurally valid because commits apply after validation.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Store for MemoryStore {
    type Work = MemoryWork;

    async fn begin(&self) -> StoreResult<MemoryWork> {
        Ok(MemoryWork {
            shared: Arc::clone(&self.shared),
            staged_accounts: BTreeMap::new(),
            inserted_accounts: Vec::new(),
            read_versions: HashMap::new(),
            staged_entries: Vec::new(),
            writes: 0,
        })
    }
}

/// Unit of work over a [`MemoryStore`]
#[derive(Debug)]
pub struct MemoryWork {
    shared: Arc<Shared>,
    staged_accounts: BTreeMap<i64, Account>,
    inserted_accounts: Vec<i64>,
    /// Version of each pre-existing account when this unit first saw it
    read_versions: HashMap<i64, i64>,
    staged_entries: Vec<LedgerEntry>,
    writes: usize,
}

impl MemoryWork {
    fn record_write(&mut self) -> StoreResult<()> {
        self.writes += 1;
        match *lock(&self.shared.fail_writes_after) {
            Some(limit) if self.writes > limit => Err(StoreError::Unavailable(format!(
                "injected failure on write {}",
                self.writes
            ))),
            _ => Ok(()),
        }
    }

    fn visible_accounts(&self) -> Vec<Account> {
        let tables = lock(&self.shared.tables);
        let mut accounts: BTreeMap<i64, Account> = tables.accounts.clone();
        accounts.extend(self.staged_accounts.clone());
        accounts.into_values().collect()
    }

    fn observe(&mut self, account: &Account) {
        if !self.inserted_accounts.contains(&account.id) {
            self.read_versions.entry(account.id).or_insert(account.version);
        }
    }
}

#[async_trait]
impl AccountStore for MemoryWork {
    async fn find_account(&mut self, id: i64) -> StoreResult<Option<Account>> {
        if let Some(account) = self.staged_accounts.get(&id) {
            return Ok(Some(account.clone()));
        }

        let found = lock(&self.shared.tables).accounts.get(&id).cloned();
        if let Some(account) = &found {
            self.observe(account);
        }
        Ok(found)
    }

    async fn find_account_by_username(&mut self, username: &str) -> StoreResult<Option<Account>> {
        let found = self
            .visible_accounts()
            .into_iter()
            .find(|a| a.username == username);
        if let Some(account) = &found {
            self.observe(account);
        }
        Ok(found)
    }

    async fn username_exists(&mut self, username: &str) -> StoreResult<bool> {
        Ok(self.visible_accounts().iter().any(|a| a.username == username))
    }

    async fn email_exists(&mut self, email: &str) -> StoreResult<bool> {
        Ok(self.visible_accounts().iter().any(|a| a.email == email))
    }

    async fn insert_account(&mut self, account: &NewAccount) -> StoreResult<Account> {
        self.record_write()?;

        let accounts = self.visible_accounts();
        if accounts.iter().any(|a| a.username == account.username) {
            return Err(StoreError::UniqueViolation(UniqueField::Username));
        }
        if accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::UniqueViolation(UniqueField::Email));
        }

        let id = self.shared.next_account_id.fetch_add(1, Ordering::SeqCst);
        let stored = account.clone().into_account(id);
        self.inserted_accounts.push(id);
        self.staged_accounts.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_account(&mut self, account: &Account) -> StoreResult<Account> {
        self.record_write()?;

        let current = match self.staged_accounts.get(&account.id) {
            Some(staged) => staged.version,
            None => {
                let committed = lock(&self.shared.tables).accounts.get(&account.id).cloned();
                let committed = committed.ok_or(StoreError::Conflict)?;
                self.observe(&committed);
                committed.version
            }
        };
        if current != account.version {
            return Err(StoreError::Conflict);
        }

        let mut updated = account.clone();
        updated.version += 1;
        self.staged_accounts.insert(updated.id, updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl LedgerStore for MemoryWork {
    async fn find_entry(&mut self, id: i64) -> StoreResult<Option<LedgerEntry>> {
        if let Some(entry) = self.staged_entries.iter().find(|e| e.id == id) {
            return Ok(Some(entry.clone()));
        }
        Ok(lock(&self.shared.tables).entries.get(&id).cloned())
    }

    async fn entries_for_account(&mut self, customer_id: i64) -> StoreResult<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = lock(&self.shared.tables)
            .entries
            .values()
            .filter(|e| e.customer_id == customer_id)
            .cloned()
            .collect();
        entries.extend(
            self.staged_entries
                .iter()
                .filter(|e| e.customer_id == customer_id)
                .cloned(),
        );
        sort_newest_first(&mut entries);
        Ok(entries)
    }

    async fn insert_entry(&mut self, entry: &NewLedgerEntry) -> StoreResult<LedgerEntry> {
        self.record_write()?;

        let id = self.shared.next_entry_id.fetch_add(1, Ordering::SeqCst);
        let stored = entry.clone().into_entry(id);
        self.staged_entries.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl UnitOfWork for MemoryWork {
    async fn commit(self) -> StoreResult<()> {
        let mut tables = lock(&self.shared.tables);

        let updated: Vec<i64> = self
            .read_versions
            .keys()
            .filter(|id| self.staged_accounts.contains_key(*id))
            .copied()
            .collect();
        {
            let mut interfering = lock(&self.shared.interfering_commits);
            if *interfering > 0 && !updated.is_empty() {
                *interfering -= 1;
                for id in &updated {
                    if let Some(account) = tables.accounts.get_mut(id) {
                        account.version += 1;
                    }
                }
            }
        }

        for (id, expected) in &self.read_versions {
            if !self.staged_accounts.contains_key(id) {
                continue;
            }
            let committed = tables.accounts.get(id).map(|a| a.version);
            if committed != Some(*expected) {
                return Err(StoreError::Conflict);
            }
        }

        for id in &self.inserted_accounts {
            let account = &self.staged_accounts[id];
            if tables.username_taken(&account.username, Some(*id)) {
                return Err(StoreError::UniqueViolation(UniqueField::Username));
            }
            if tables.email_taken(&account.email, Some(*id)) {
                return Err(StoreError::UniqueViolation(UniqueField::Email));
            }
        }

        // Inserted accounts land at version 0 plus any updates made in this unit
        tables.accounts.extend(self.staged_accounts);
        for entry in self.staged_entries {
            tables.entries.insert(entry.id, entry);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Amount, Balance};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn candidate(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password: "pw".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: None,
            balance: Balance::zero(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_work_is_discarded() {
        let store = MemoryStore::new();

        let mut work = store.begin().await.unwrap();
        let account = work.insert_account(&candidate("a", "a@x.io")).await.unwrap();
        drop(work);

        assert!(store.committed_account(account.id).is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_accounts_and_entries() {
        let store = MemoryStore::new();

        let mut work = store.begin().await.unwrap();
        let account = work.insert_account(&candidate("a", "a@x.io")).await.unwrap();
        work.insert_entry(&NewLedgerEntry::deposit(
            account.id,
            Amount::new(dec!(5)).unwrap(),
            Balance::new(dec!(5)).unwrap(),
            None,
            Utc::now(),
        ))
        .await
        .unwrap();
        work.commit().await.unwrap();

        assert!(store.committed_account(account.id).is_some());
        assert_eq!(store.committed_entry_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_at_commit() {
        let store = MemoryStore::new();
        let mut setup = store.begin().await.unwrap();
        let account = setup.insert_account(&candidate("a", "a@x.io")).await.unwrap();
        setup.commit().await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        let mut from_first = first.find_account(account.id).await.unwrap().unwrap();
        let mut from_second = second.find_account(account.id).await.unwrap().unwrap();

        from_first.balance = dec!(10);
        from_second.balance = dec!(20);
        first.update_account(&from_first).await.unwrap();
        second.update_account(&from_second).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::Conflict)));

        assert_eq!(store.committed_account(account.id).unwrap().balance, dec!(10));
    }

    #[tokio::test]
    async fn test_update_with_stale_version_is_rejected_immediately() {
        let store = MemoryStore::new();
        let mut setup = store.begin().await.unwrap();
        let mut account = setup.insert_account(&candidate("a", "a@x.io")).await.unwrap();
        setup.commit().await.unwrap();

        account.version = 7;
        let mut work = store.begin().await.unwrap();
        work.find_account(account.id).await.unwrap();
        assert!(matches!(
            work.update_account(&account).await,
            Err(StoreError::Conflict)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_username_rejected_at_commit() {
        let store = MemoryStore::new();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_account(&candidate("dup", "one@x.io")).await.unwrap();
        second.insert_account(&candidate("dup", "two@x.io")).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(
            second.commit().await,
            Err(StoreError::UniqueViolation(UniqueField::Username))
        ));
    }

    #[tokio::test]
    async fn test_interfering_writer_fails_one_commit() {
        let store = MemoryStore::new();
        let mut setup = store.begin().await.unwrap();
        let account = setup.insert_account(&candidate("a", "a@x.io")).await.unwrap();
        setup.commit().await.unwrap();

        store.interfere_with_next_commits(1);

        // Registrations touch no existing account
        let mut work = store.begin().await.unwrap();
        work.insert_account(&candidate("b", "b@x.io")).await.unwrap();
        tokio_test::assert_ok!(work.commit().await);

        let mut work = store.begin().await.unwrap();
        let mut loaded = work.find_account(account.id).await.unwrap().unwrap();
        loaded.balance = dec!(10);
        work.update_account(&loaded).await.unwrap();
        assert!(matches!(work.commit().await, Err(StoreError::Conflict)));

        let committed = store.committed_account(account.id).unwrap();
        assert_eq!(committed.balance, Decimal::ZERO);
        assert_eq!(committed.version, 1);

        let mut work = store.begin().await.unwrap();
        let mut loaded = work.find_account(account.id).await.unwrap().unwrap();
        loaded.balance = dec!(10);
        work.update_account(&loaded).await.unwrap();
        tokio_test::assert_ok!(work.commit().await);
        assert_eq!(store.committed_account(account.id).unwrap().balance, dec!(10));
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let store = MemoryStore::new();
        store.fail_writes_after(1);

        let mut work = store.begin().await.unwrap();
        work.insert_account(&candidate("a", "a@x.io")).await.unwrap();
        let second = work.insert_account(&candidate("b", "b@x.io")).await;
        assert!(matches!(second, Err(StoreError::Unavailable(_))));

        store.clear_write_failures();
        let mut work = store.begin().await.unwrap();
        tokio_test::assert_ok!(work.insert_account(&candidate("c", "c@x.io")).await);
        tokio_test::assert_ok!(work.insert_account(&candidate("d", "d@x.io")).await);
    }
}
