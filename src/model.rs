//! Core domain types for the ledger engine.

use chrono::{DateTime, Utc};

use crate::Amount;

/// Account identifier.
pub type AccountId = u64;

/// User (account owner) identifier.
pub type UserId = u64;

/// Transaction record identifier.
pub type TxId = u64;

/// The kind of an account, governing which transfer pairings are legal and
/// whether debits are subject to the daily limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    /// Primary spending account; debits count against the daily limit.
    Main,
    /// Secondary account; may only move funds via a main account.
    Savings,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Main => "main",
            AccountKind::Savings => "savings",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation representing the possible inputs of the engine.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Create a fresh account with an opening balance.
    Open {
        account: AccountId,
        user: UserId,
        kind: AccountKind,
        balance: Amount,
        daily_max: Amount,
    },
    /// Move funds between two accounts, replenishing the source on shortfall.
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Credit funds to an account.
    Deposit { account: AccountId, amount: Amount },
    /// Debit funds from an account.
    Withdraw { account: AccountId, amount: Amount },
}

/// What a transaction record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Transfer { from: AccountId, to: AccountId },
    Deposit { account: AccountId },
    Withdraw { account: AccountId },
    /// Automatic replenishment credited from the linked funding source.
    Topup { account: AccountId },
}

/// Lifecycle of a transaction record. The status transition is the only
/// permitted mutation; records are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

/// Append-only record of a committed ledger operation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: TxId,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub at: DateTime<Utc>,
    status: TransactionStatus,
}

impl TransactionRecord {
    /// Create a new record in the `Pending` state.
    pub fn new(id: TxId, kind: TransactionKind, amount: Amount, at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            amount,
            at,
            status: TransactionStatus::Pending,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Mark a pending record as completed. Terminal states are left alone.
    pub fn complete(&mut self) {
        if self.status == TransactionStatus::Pending {
            self.status = TransactionStatus::Completed;
        }
    }

    /// Mark a pending record as cancelled. Terminal states are left alone.
    pub fn cancel(&mut self) {
        if self.status == TransactionStatus::Pending {
            self.status = TransactionStatus::Cancelled;
        }
    }
}
