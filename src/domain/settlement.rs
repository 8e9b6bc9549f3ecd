use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Balances, Cents, GroupId, MINOR_UNIT, MemberId};

pub type SettlementId = Uuid;

/// Balances within this distance of zero count as settled. It matches the
/// rounding drift a single expense's splits are allowed to carry.
pub const SETTLEMENT_EPSILON: Cents = MINOR_UNIT;

/// Lifecycle of a settlement record. `pending -> completed` is the only
/// transition, and completed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Completed,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded transfer proposal between two members. Created from planner
/// output; the planner itself never touches these records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub group_id: GroupId,
    /// Member paying the money
    pub from_member: MemberId,
    /// Member receiving the money
    pub to_member: MemberId,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Settlement {
    pub fn new(group_id: GroupId, from: MemberId, to: MemberId, amount_cents: Cents) -> Self {
        assert!(amount_cents > 0, "Settlement amount must be positive");
        Self {
            id: Uuid::new_v4(),
            group_id,
            from_member: from,
            to_member: to,
            amount_cents,
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark the settlement as paid. Returns false when it already was,
    /// leaving the record untouched.
    pub fn complete(&mut self) -> bool {
        if self.status == SettlementStatus::Completed {
            return false;
        }
        self.status = SettlementStatus::Completed;
        self.completed_at = Some(Utc::now());
        true
    }

    pub fn is_pending(&self) -> bool {
        self.status == SettlementStatus::Pending
    }

    pub fn involves(&self, member: MemberId) -> bool {
        self.from_member == member || self.to_member == member
    }
}

/// One step of a settlement plan, not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProposedTransfer {
    pub from: MemberId,
    pub to: MemberId,
    pub amount_cents: Cents,
}

impl From<&Settlement> for ProposedTransfer {
    fn from(settlement: &Settlement) -> Self {
        Self {
            from: settlement.from_member,
            to: settlement.to_member,
            amount_cents: settlement.amount_cents,
        }
    }
}

/// Raised when the input balances do not sum to zero within the
/// settlement tolerance. Balances produced by the engine always do, so
/// this signals a bug in the caller's data, not a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("balances sum to {net} cents, expected zero within {tolerance}")]
pub struct ImbalancedInputError {
    pub net: Cents,
    pub tolerance: Cents,
}

/// Heap entry ordered by remaining amount; the original mapping position
/// breaks ties so that equal amounts keep their input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Party {
    remaining: Cents,
    position: usize,
    member: MemberId,
}

impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.remaining
            .cmp(&other.remaining)
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Plan a minimal-ish list of pairwise transfers that zeroes the given
/// balances (within [`SETTLEMENT_EPSILON`]).
///
/// Greedy largest-first matching: the biggest creditor is repeatedly
/// paired with the biggest debtor for `min` of their remainders. Members
/// at exactly zero never take part. Every matched cent is carried through
/// to the end, so after applying the plan no member is left further from
/// zero than the input sum was; only the input drift itself (at most one
/// minor unit) can survive. The result is deterministic and at most one
/// transfer short of the number of non-zero members; it is not guaranteed
/// globally minimal (that problem is NP-hard), which matches how deployed
/// debt-simplification features behave.
pub fn plan_settlements(balances: &Balances) -> Result<Vec<ProposedTransfer>, ImbalancedInputError> {
    let net: Cents = balances.values().sum();
    if net.abs() > SETTLEMENT_EPSILON {
        return Err(ImbalancedInputError {
            net,
            tolerance: SETTLEMENT_EPSILON,
        });
    }

    let mut creditors = BinaryHeap::new();
    let mut debtors = BinaryHeap::new();
    for (position, (&member, &net_amount)) in balances.iter().enumerate() {
        if net_amount > 0 {
            creditors.push(Party {
                remaining: net_amount,
                position,
                member,
            });
        } else if net_amount < 0 {
            debtors.push(Party {
                remaining: -net_amount,
                position,
                member,
            });
        }
    }

    let mut transfers = Vec::new();
    while let (Some(mut creditor), Some(mut debtor)) = (creditors.pop(), debtors.pop()) {
        let amount = creditor.remaining.min(debtor.remaining);
        transfers.push(ProposedTransfer {
            from: debtor.member,
            to: creditor.member,
            amount_cents: amount,
        });
        creditor.remaining -= amount;
        debtor.remaining -= amount;
        if creditor.remaining > 0 {
            creditors.push(creditor);
        }
        if debtor.remaining > 0 {
            debtors.push(debtor);
        }
    }

    tracing::debug!(
        members = balances.len(),
        transfers = transfers.len(),
        "settlement plan computed"
    );
    Ok(transfers)
}

/// Apply transfers to a balance mapping: the payer's debt shrinks, the
/// receiver's credit shrinks.
pub fn apply_transfers(balances: &mut Balances, transfers: &[ProposedTransfer]) {
    for transfer in transfers {
        *balances.entry(transfer.from).or_insert(0) += transfer.amount_cents;
        *balances.entry(transfer.to).or_insert(0) -= transfer.amount_cents;
    }
}
