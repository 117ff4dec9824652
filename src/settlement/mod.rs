//! Bill settlement: splitting a total into per-participant shares.
//!
//! The allocator is pure; randomness and time come in through the
//! [`FractionSource`] and [`Clock`] seams so a seeded run reproduces its
//! shares exactly. Both policies guarantee the shares sum to the total with
//! no rounding residue.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::Amount;
use crate::clock::Clock;
use crate::model::UserId;
use crate::rng::FractionSource;

mod error;
pub use error::{AllocationError, SettlementError, UnsupportedPolicy};

/// Settlement identifier.
pub type SettlementId = u64;

/// How a total is divided among participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Equal shares, remainder on the last participant.
    Equal,
    /// Random shares of at least one minor unit each.
    Random,
}

impl FromStr for AllocationPolicy {
    type Err = UnsupportedPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("equal") {
            Ok(AllocationPolicy::Equal)
        } else if s.eq_ignore_ascii_case("random") {
            Ok(AllocationPolicy::Random)
        } else {
            Err(UnsupportedPolicy(s.to_string()))
        }
    }
}

/// Split `total` into `participants` shares under the given policy.
///
/// The returned shares always sum to `total` exactly. Under
/// [`AllocationPolicy::Random`] every share is at least one minor unit,
/// which requires `total >= participants`.
pub fn allocate(
    total: Amount,
    participants: usize,
    policy: AllocationPolicy,
    rng: &mut dyn FractionSource,
) -> Result<Vec<Amount>, AllocationError> {
    if participants == 0 {
        return Err(AllocationError::InvalidParticipantCount(participants));
    }
    if total.is_negative() {
        return Err(AllocationError::NegativeTotal(total));
    }

    match policy {
        AllocationPolicy::Equal => Ok(equal_split(total, participants)),
        AllocationPolicy::Random => random_split(total, participants, rng),
    }
}

/// Everyone owes `floor(total / n)`; the last participant also picks up the
/// remainder.
fn equal_split(total: Amount, participants: usize) -> Vec<Amount> {
    let n = participants as i64;
    let base = total.div_floor(n);

    let mut shares = vec![base; participants - 1];
    shares.push(total - base * (n - 1));
    shares
}

/// Draw each share as a random fraction of what is still owed, clamped to at
/// least one minor unit, while reserving one unit for every participant
/// still waiting. The last participant takes whatever remains.
fn random_split(
    total: Amount,
    participants: usize,
    rng: &mut dyn FractionSource,
) -> Result<Vec<Amount>, AllocationError> {
    if total < Amount::from_minor(participants as i64) {
        return Err(AllocationError::TotalBelowParticipantCount {
            total,
            participants,
        });
    }

    let mut remaining = total;
    let mut shares = Vec::with_capacity(participants);
    for waiting in (1..participants).rev() {
        let cap = remaining.minor() - waiting as i64;
        let candidate = (rng.next_fraction() * cap as f64).floor() as i64;
        let share = Amount::from_minor(candidate.max(1));
        shares.push(share);
        remaining -= share;
    }
    shares.push(remaining);
    Ok(shares)
}

/// Lifecycle of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Per-participant decision on their share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareApproval {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// One participant's slice of a settlement.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementShare {
    participant: UserId,
    amount: Amount,
    approval: ShareApproval,
}

impl SettlementShare {
    pub fn participant(&self) -> UserId {
        self.participant
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn approval(&self) -> ShareApproval {
        self.approval
    }
}

/// A request to divide `total` among participants, with per-participant
/// approval tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    id: SettlementId,
    requester: UserId,
    total: Amount,
    created_at: DateTime<Utc>,
    status: SettlementStatus,
    shares: Vec<SettlementShare>,
}

impl Settlement {
    /// Allocate shares and build the aggregate. Shares keep the order of
    /// `participants`.
    pub fn create(
        id: SettlementId,
        requester: UserId,
        total: Amount,
        participants: &[UserId],
        policy: AllocationPolicy,
        rng: &mut dyn FractionSource,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AllocationError> {
        let amounts = allocate(total, participants.len(), policy, rng)?;
        let shares = participants
            .iter()
            .zip(amounts)
            .map(|(&participant, amount)| SettlementShare {
                participant,
                amount,
                approval: ShareApproval::Pending,
            })
            .collect();

        Ok(Self {
            id,
            requester,
            total,
            created_at,
            status: SettlementStatus::Pending,
            shares,
        })
    }

    pub fn id(&self) -> SettlementId {
        self.id
    }

    pub fn requester(&self) -> UserId {
        self.requester
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> SettlementStatus {
        self.status
    }

    pub fn shares(&self) -> &[SettlementShare] {
        &self.shares
    }

    pub fn share(&self, participant: UserId) -> Option<&SettlementShare> {
        self.shares.iter().find(|s| s.participant == participant)
    }

    /// Record the participant's approval. The settlement completes when the
    /// last pending share is approved.
    pub fn approve(&mut self, participant: UserId) -> Result<(), SettlementError> {
        self.resolve(participant, ShareApproval::Approved)
    }

    /// Record the participant's rejection, cancelling the settlement.
    pub fn reject(&mut self, participant: UserId) -> Result<(), SettlementError> {
        self.resolve(participant, ShareApproval::Rejected)
    }

    fn resolve(
        &mut self,
        participant: UserId,
        decision: ShareApproval,
    ) -> Result<(), SettlementError> {
        if self.status != SettlementStatus::Pending {
            return Err(SettlementError::SettlementClosed {
                settlement: self.id,
            });
        }

        let share = self
            .shares
            .iter_mut()
            .find(|s| s.participant == participant)
            .ok_or(SettlementError::ParticipantNotFound {
                settlement: self.id,
                participant,
            })?;

        if share.approval != ShareApproval::Pending {
            return Err(SettlementError::ShareAlreadyResolved {
                settlement: self.id,
                participant,
            });
        }
        share.approval = decision;

        if decision == ShareApproval::Rejected {
            self.status = SettlementStatus::Cancelled;
        } else if self.shares.iter().all(|s| s.approval == ShareApproval::Approved) {
            self.status = SettlementStatus::Completed;
        }
        Ok(())
    }
}

/// In-memory settlement aggregates, keyed by id.
#[derive(Debug, Default)]
pub struct SettlementBook {
    settlements: Mutex<HashMap<SettlementId, Settlement>>,
    next_id: AtomicU64,
}

impl SettlementBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate shares for `participants` and persist the new settlement.
    pub fn create(
        &self,
        requester: UserId,
        total: Amount,
        participants: &[UserId],
        policy: AllocationPolicy,
        rng: &mut dyn FractionSource,
        clock: &dyn Clock,
    ) -> Result<Settlement, AllocationError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let settlement =
            Settlement::create(id, requester, total, participants, policy, rng, clock.now())?;

        info!(
            settlement = id,
            requester,
            total = %total,
            participants = participants.len(),
            "settlement created"
        );
        self.settlements
            .lock()
            .expect("settlement lock poisoned")
            .insert(id, settlement.clone());
        Ok(settlement)
    }

    pub fn get(&self, id: SettlementId) -> Result<Settlement, SettlementError> {
        self.settlements
            .lock()
            .expect("settlement lock poisoned")
            .get(&id)
            .cloned()
            .ok_or(SettlementError::SettlementNotFound(id))
    }

    /// Approve one participant's share; returns the updated settlement.
    pub fn approve(
        &self,
        id: SettlementId,
        participant: UserId,
    ) -> Result<Settlement, SettlementError> {
        self.update(id, |settlement| {
            settlement.approve(participant)?;
            info!(settlement = id, participant, "share approved");
            Ok(())
        })
    }

    /// Reject one participant's share; returns the updated settlement.
    pub fn reject(
        &self,
        id: SettlementId,
        participant: UserId,
    ) -> Result<Settlement, SettlementError> {
        self.update(id, |settlement| {
            settlement.reject(participant)?;
            info!(settlement = id, participant, "share rejected");
            Ok(())
        })
    }

    fn update(
        &self,
        id: SettlementId,
        mutate: impl FnOnce(&mut Settlement) -> Result<(), SettlementError>,
    ) -> Result<Settlement, SettlementError> {
        let mut settlements = self.settlements.lock().expect("settlement lock poisoned");
        let settlement = settlements
            .get_mut(&id)
            .ok_or(SettlementError::SettlementNotFound(id))?;
        mutate(settlement)?;
        Ok(settlement.clone())
    }
}
