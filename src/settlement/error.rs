//! Error types for settlement allocation and share resolution.

use thiserror::Error;

use crate::Amount;
use crate::model::UserId;
use crate::settlement::SettlementId;

/// Error computing the share split.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("participant count must be positive, got {0}")]
    InvalidParticipantCount(usize),

    #[error("total amount must not be negative, got {0}")]
    NegativeTotal(Amount),

    #[error("total {total} cannot give each of {participants} participants a minimum share")]
    TotalBelowParticipantCount { total: Amount, participants: usize },
}

/// An allocation policy name that does not parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported allocation policy '{0}'")]
pub struct UnsupportedPolicy(pub String);

/// Error resolving a settlement share.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("settlement {0} not found")]
    SettlementNotFound(SettlementId),

    #[error("participant {participant} is not part of settlement {settlement}")]
    ParticipantNotFound {
        settlement: SettlementId,
        participant: UserId,
    },

    #[error("participant {participant} already resolved their share of settlement {settlement}")]
    ShareAlreadyResolved {
        settlement: SettlementId,
        participant: UserId,
    },

    #[error("settlement {settlement} is no longer pending")]
    SettlementClosed { settlement: SettlementId },
}
