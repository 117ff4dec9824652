//! Persistence seam: account rows behind conditional writes, plus the
//! append-only transaction log.
//!
//! The engine only ever persists through [`AccountStore::commit`], which
//! compares every row's stored version against the version captured at load
//! time. A stale write is rejected, never merged. [`MemoryStore`] is the
//! in-process implementation; any backend with conditional writes can stand
//! in behind the same trait.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::engine::Account;
use crate::model::{AccountId, TransactionRecord, TxId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("account {0} not found")]
    NotFound(AccountId),

    #[error("account {0} already exists")]
    AlreadyExists(AccountId),

    #[error("version conflict on account {account}: expected {expected}, stored {stored}")]
    VersionConflict {
        account: AccountId,
        expected: u64,
        stored: u64,
    },
}

/// Account rows with load / conditional-commit semantics.
pub trait AccountStore: Send + Sync {
    fn load(&self, id: AccountId) -> Result<Account, StoreError>;

    fn insert(&self, account: Account) -> Result<(), StoreError>;

    /// Persist every row, conditioned on every row's version being unchanged
    /// since load. Either all rows commit (each version bumped by one) or
    /// none do.
    fn commit(&self, accounts: &[Account]) -> Result<(), StoreError>;
}

/// Append-only transaction record log.
pub trait TransactionLog: Send + Sync {
    /// Allocate the next record id.
    fn next_id(&self) -> TxId;

    fn append(&self, record: TransactionRecord);
}

impl<S: AccountStore + ?Sized> AccountStore for std::sync::Arc<S> {
    fn load(&self, id: AccountId) -> Result<Account, StoreError> {
        (**self).load(id)
    }

    fn insert(&self, account: Account) -> Result<(), StoreError> {
        (**self).insert(account)
    }

    fn commit(&self, accounts: &[Account]) -> Result<(), StoreError> {
        (**self).commit(accounts)
    }
}

impl<L: TransactionLog + ?Sized> TransactionLog for std::sync::Arc<L> {
    fn next_id(&self) -> TxId {
        (**self).next_id()
    }

    fn append(&self, record: TransactionRecord) {
        (**self).append(record)
    }
}

/// In-memory store. One mutex serializes commits, which is what gives the
/// multi-row commit its all-or-nothing behavior.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Mutex<HashMap<AccountId, Account>>,
    records: Mutex<Vec<TransactionRecord>>,
    next_tx: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all accounts, ordered by id.
    pub fn accounts(&self) -> Vec<Account> {
        let map = self.accounts.lock().expect("store lock poisoned");
        let mut accounts: Vec<Account> = map.values().cloned().collect();
        accounts.sort_by_key(Account::id);
        accounts
    }

    /// Snapshot of the transaction log, in append order.
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.lock().expect("store lock poisoned").clone()
    }
}

impl AccountStore for MemoryStore {
    fn load(&self, id: AccountId) -> Result<Account, StoreError> {
        let map = self.accounts.lock().expect("store lock poisoned");
        map.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut map = self.accounts.lock().expect("store lock poisoned");
        if map.contains_key(&account.id()) {
            return Err(StoreError::AlreadyExists(account.id()));
        }
        map.insert(account.id(), account);
        Ok(())
    }

    fn commit(&self, accounts: &[Account]) -> Result<(), StoreError> {
        let mut map = self.accounts.lock().expect("store lock poisoned");

        // verify every row before touching any
        for account in accounts {
            let stored = map
                .get(&account.id())
                .ok_or(StoreError::NotFound(account.id()))?;
            if stored.version() != account.version() {
                return Err(StoreError::VersionConflict {
                    account: account.id(),
                    expected: account.version(),
                    stored: stored.version(),
                });
            }
        }

        for account in accounts {
            let mut next = account.clone();
            next.bump_version();
            map.insert(next.id(), next);
        }
        Ok(())
    }
}

impl TransactionLog for MemoryStore {
    fn next_id(&self) -> TxId {
        self.next_tx.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn append(&self, record: TransactionRecord) {
        self.records.lock().expect("store lock poisoned").push(record);
    }
}
