use chrono::NaiveDate;

use crate::Amount;
use crate::engine::limit::DailyLimit;
use crate::model::{AccountId, AccountKind, UserId};

/// A ledger account: balance, optimistic-concurrency version, and the
/// embedded daily-limit counter.
///
/// Balance and limit state live in the same record so a single
/// version-guarded save commits both; there is no window where one is
/// visible without the other.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    id: AccountId,
    user: UserId,
    kind: AccountKind,
    balance: Amount,
    version: u64,
    limit: DailyLimit,
}

impl Account {
    /// Open a fresh account at version 0.
    pub fn open(
        id: AccountId,
        user: UserId,
        kind: AccountKind,
        balance: Amount,
        daily_max: Amount,
        today: NaiveDate,
    ) -> Self {
        debug_assert!(!balance.is_negative(), "opening balance must not be negative");
        Self {
            id,
            user,
            kind,
            balance,
            version: 0,
            limit: DailyLimit::new(daily_max, today),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Version captured at load time; the store's conditional save compares
    /// against it and bumps it on commit.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn limit(&self) -> &DailyLimit {
        &self.limit
    }

    pub(crate) fn limit_mut(&mut self) -> &mut DailyLimit {
        &mut self.limit
    }

    pub(crate) fn credit(&mut self, amount: Amount) {
        debug_assert!(!amount.is_negative());
        self.balance += amount;
    }

    /// Subtract `amount` from the balance. Callers check sufficiency first;
    /// the debug assertion backs the non-negativity invariant in tests.
    pub(crate) fn debit(&mut self, amount: Amount) {
        debug_assert!(!amount.is_negative());
        debug_assert!(self.balance >= amount, "debit would overdraw account");
        self.balance -= amount;
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }
}
