//! Ledger engine.
//!
//! The engine orchestrates balance mutation over version-guarded account
//! rows: transfers with automatic shortfall replenishment, deposits,
//! withdrawals, and daily-limit enforcement. Every mutation commits through
//! the store's conditional write and is retried from a fresh load on
//! version conflict. Also supports an async stream of operations.

use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::Amount;
use crate::clock::Clock;
use crate::model::{
    AccountId, AccountKind, Operation, TransactionKind, TransactionRecord, UserId,
};
use crate::store::{AccountStore, StoreError, TransactionLog};

mod account;
pub use account::Account;

mod limit;
pub use limit::{DEFAULT_DAILY_MAX, DailyLimit};

mod retry;
pub use retry::{ConcurrencyGuard, DEFAULT_MAX_ATTEMPTS, Retryable};

mod error;
pub use error::{
    DailyLimitExceeded, DepositError, EngineError, OpenError, TransferError, WithdrawError,
};

/// Default replenishment unit: shortfalls are covered in multiples of this.
pub const DEFAULT_TOPUP_UNIT: Amount = Amount::from_minor(10_000);

/// Whether a withdrawal consumes the daily limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitEnforcement {
    Enforced,
    Bypassed,
}

/// The ledger engine.
///
/// Account rows are mutated exclusively through this type; the store, log
/// and clock are injected so tests control persistence and time.
pub struct Engine<S, L, C> {
    store: S,
    log: L,
    clock: C,
    guard: ConcurrencyGuard,
    topup_unit: Amount,
}

/// Public API
impl<S: AccountStore, L: TransactionLog, C: Clock> Engine<S, L, C> {
    pub fn new(store: S, log: L, clock: C) -> Self {
        Self {
            store,
            log,
            clock,
            guard: ConcurrencyGuard::default(),
            topup_unit: DEFAULT_TOPUP_UNIT,
        }
    }

    pub fn with_topup_unit(mut self, unit: Amount) -> Self {
        assert!(unit.is_positive(), "top-up unit must be positive");
        self.topup_unit = unit;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.guard = ConcurrencyGuard::new(max_attempts);
        self
    }

    /// Run the engine over the given operation stream.
    pub async fn run(&self, mut stream: impl Stream<Item = Operation> + Unpin) {
        while let Some(op) = stream.next().await {
            // any error should not stop the engine, so we just ignore the application result
            let _ = self.apply(op);
        }
    }

    /// Read-only view of one account.
    pub fn account(&self, id: AccountId) -> Result<Account, StoreError> {
        self.store.load(id)
    }

    /// Apply a single operation on top of the current ledger state.
    pub fn apply(&self, op: Operation) -> Result<(), EngineError> {
        match op {
            Operation::Open {
                account,
                user,
                kind,
                balance,
                daily_max,
            } => {
                let result = self
                    .open_account(account, user, kind, balance, daily_max)
                    .map(drop);
                Self::log_result("open", account, balance, &result);
                result?;
            }
            Operation::Transfer { from, to, amount } => {
                let result = self.transfer(from, to, amount).map(drop);
                match &result {
                    Ok(()) => info!(from, to, amount = %amount, "transfer applied"),
                    Err(e) => info!(from, to, amount = %amount, reason = %e, "transfer skipped"),
                }
                result?;
            }
            Operation::Deposit { account, amount } => {
                let result = self.deposit(account, amount).map(drop);
                Self::log_result("deposit", account, amount, &result);
                result?;
            }
            Operation::Withdraw { account, amount } => {
                let result = self
                    .withdraw(account, amount, LimitEnforcement::Bypassed)
                    .map(drop);
                Self::log_result("withdraw", account, amount, &result);
                result?;
            }
        }
        Ok(())
    }

    /// Create a fresh account at version 0.
    pub fn open_account(
        &self,
        id: AccountId,
        user: UserId,
        kind: AccountKind,
        balance: Amount,
        daily_max: Amount,
    ) -> Result<Account, OpenError> {
        if balance.is_negative() {
            return Err(OpenError::NegativeOpeningBalance(balance));
        }

        let account = Account::open(id, user, kind, balance, daily_max, self.clock.today());
        self.store.insert(account.clone())?;
        Ok(account)
    }

    /// Move `amount` between two accounts.
    ///
    /// A source shortfall is first covered by an automatic replenishment
    /// rounded up to the configured unit; the replenishment plus the amount
    /// count against the source's daily limit when the source is a main
    /// account. Debit and credit commit atomically; on version conflict the
    /// whole operation retries from a fresh load.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<TransactionRecord, TransferError> {
        if !amount.is_positive() {
            return Err(TransferError::NonPositiveAmount(amount));
        }
        if from == to {
            return Err(TransferError::SelfTransfer(from));
        }

        let topup = self.guard.run(|| self.try_transfer(from, to, amount))?;

        let now = self.clock.now();
        if topup.is_positive() {
            warn!(account = from, amount = %topup, "shortfall covered by linked funding source");
            let mut record = TransactionRecord::new(
                self.log.next_id(),
                TransactionKind::Topup { account: from },
                topup,
                now,
            );
            record.complete();
            self.log.append(record);
        }

        let mut record = TransactionRecord::new(
            self.log.next_id(),
            TransactionKind::Transfer { from, to },
            amount,
            now,
        );
        record.complete();
        self.log.append(record.clone());
        Ok(record)
    }

    /// Credit `amount` to an account.
    pub fn deposit(
        &self,
        account: AccountId,
        amount: Amount,
    ) -> Result<TransactionRecord, DepositError> {
        if !amount.is_positive() {
            return Err(DepositError::NonPositiveAmount(amount));
        }

        self.guard.run(|| -> Result<(), DepositError> {
            let mut acc = self.store.load(account)?;
            acc.credit(amount);
            self.store.commit(&[acc])?;
            Ok(())
        })?;

        let mut record = TransactionRecord::new(
            self.log.next_id(),
            TransactionKind::Deposit { account },
            amount,
            self.clock.now(),
        );
        record.complete();
        self.log.append(record.clone());
        Ok(record)
    }

    /// Debit `amount` from an account, with no counterpart credit.
    ///
    /// The daily limit is consumed only when the caller asks for an
    /// enforced withdrawal and the account is a main account.
    pub fn withdraw(
        &self,
        account: AccountId,
        amount: Amount,
        enforcement: LimitEnforcement,
    ) -> Result<TransactionRecord, WithdrawError> {
        if !amount.is_positive() {
            return Err(WithdrawError::NonPositiveAmount(amount));
        }

        self.guard.run(|| -> Result<(), WithdrawError> {
            let mut acc = self.store.load(account)?;

            if enforcement == LimitEnforcement::Enforced && acc.kind() == AccountKind::Main {
                acc.limit_mut().check_and_consume(amount, self.clock.today())?;
            }

            if acc.balance() < amount {
                return Err(WithdrawError::InsufficientBalance {
                    account,
                    balance: acc.balance(),
                    requested: amount,
                });
            }

            acc.debit(amount);
            self.store.commit(&[acc])?;
            Ok(())
        })?;

        let mut record = TransactionRecord::new(
            self.log.next_id(),
            TransactionKind::Withdraw { account },
            amount,
            self.clock.now(),
        );
        record.complete();
        self.log.append(record.clone());
        Ok(record)
    }
}

/// Private API
impl<S: AccountStore, L: TransactionLog, C: Clock> Engine<S, L, C> {
    /// Small helper to log operation results
    fn log_result<E: std::fmt::Display>(
        op: &str,
        account: AccountId,
        amount: Amount,
        result: &Result<(), E>,
    ) {
        match result {
            Ok(()) => info!(account, amount = %amount, "{op} applied"),
            Err(e) => info!(account, amount = %amount, reason = %e, "{op} skipped"),
        }
    }

    /// One transfer attempt: load both rows, mutate, commit conditionally.
    /// Returns the replenishment that was applied, if any.
    fn try_transfer(
        &self,
        from_id: AccountId,
        to_id: AccountId,
        amount: Amount,
    ) -> Result<Amount, TransferError> {
        let mut from = self.store.load(from_id)?;
        let mut to = self.store.load(to_id)?;

        // savings accounts may only move funds via a main account
        if from.kind() == AccountKind::Savings && to.kind() == AccountKind::Savings {
            return Err(TransferError::InvalidPairing {
                from: from_id,
                to: to_id,
            });
        }

        let topup = if from.balance() < amount {
            (amount - from.balance()).round_up_to(self.topup_unit)
        } else {
            Amount::ZERO
        };

        let total_debited = amount + topup;
        if from.kind() == AccountKind::Main {
            from.limit_mut()
                .check_and_consume(total_debited, self.clock.today())?;
        }

        if topup.is_positive() {
            from.credit(topup);
        }

        // by construction the balance now covers the amount; keep the check
        if from.balance() < amount {
            return Err(TransferError::InsufficientBalance {
                account: from_id,
                balance: from.balance(),
                requested: amount,
            });
        }

        from.debit(amount);
        to.credit(amount);

        self.store.commit(&[from, to])?;
        Ok(topup)
    }
}
