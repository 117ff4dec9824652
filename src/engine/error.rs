//! Error types for ledger operations.

use thiserror::Error;

use crate::Amount;
use crate::engine::retry::Retryable;
use crate::model::AccountId;
use crate::store::StoreError;

/// Top-level error returned by [`Engine::apply`](super::Engine::apply).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("open failed: {0}")]
    Open(#[from] OpenError),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("deposit failed: {0}")]
    Deposit(#[from] DepositError),

    #[error("withdrawal failed: {0}")]
    Withdraw(#[from] WithdrawError),
}

/// Error during account creation.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("account {0} already exists")]
    AlreadyExists(AccountId),

    #[error("opening balance must not be negative, got {0}")]
    NegativeOpeningBalance(Amount),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for OpenError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(id) => OpenError::AlreadyExists(id),
            other => OpenError::Store(other),
        }
    }
}

/// The daily debit ceiling would be exceeded; usage is left unchanged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("daily limit exceeded: used {used} + requested {requested} exceeds max {max}")]
pub struct DailyLimitExceeded {
    pub used: Amount,
    pub requested: Amount,
    pub max: Amount,
}

/// Error during transfer processing.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("transfer into the same account {0}")]
    SelfTransfer(AccountId),

    #[error("transfers between two savings accounts are not allowed ({from} -> {to})")]
    InvalidPairing { from: AccountId, to: AccountId },

    #[error("insufficient balance in account {account}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        account: AccountId,
        balance: Amount,
        requested: Amount,
    },

    #[error(transparent)]
    DailyLimit(#[from] DailyLimitExceeded),

    #[error("abandoned after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TransferError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => TransferError::AccountNotFound(id),
            other => TransferError::Store(other),
        }
    }
}

impl Retryable for TransferError {
    fn is_conflict(&self) -> bool {
        matches!(self, TransferError::Store(StoreError::VersionConflict { .. }))
    }

    fn into_exhausted(self, attempts: u32) -> Self {
        TransferError::Conflict { attempts }
    }
}

/// Error during deposit processing.
#[derive(Debug, Error)]
pub enum DepositError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("abandoned after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for DepositError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => DepositError::AccountNotFound(id),
            other => DepositError::Store(other),
        }
    }
}

impl Retryable for DepositError {
    fn is_conflict(&self) -> bool {
        matches!(self, DepositError::Store(StoreError::VersionConflict { .. }))
    }

    fn into_exhausted(self, attempts: u32) -> Self {
        DepositError::Conflict { attempts }
    }
}

/// Error during withdrawal processing.
#[derive(Debug, Error)]
pub enum WithdrawError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Amount),

    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    #[error("insufficient balance in account {account}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        account: AccountId,
        balance: Amount,
        requested: Amount,
    },

    #[error(transparent)]
    DailyLimit(#[from] DailyLimitExceeded),

    #[error("abandoned after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WithdrawError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => WithdrawError::AccountNotFound(id),
            other => WithdrawError::Store(other),
        }
    }
}

impl Retryable for WithdrawError {
    fn is_conflict(&self) -> bool {
        matches!(self, WithdrawError::Store(StoreError::VersionConflict { .. }))
    }

    fn into_exhausted(self, attempts: u32) -> Self {
        WithdrawError::Conflict { attempts }
    }
}
