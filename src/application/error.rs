use thiserror::Error;

use crate::domain::{Cents, DataIntegrityError, GroupId, ImbalancedInputError, SettlementId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Group already exists: {0}")]
    GroupAlreadyExists(String),

    #[error("Member not found in group: {0}")]
    MemberNotFound(String),

    #[error("Member already exists in group: {0}")]
    MemberAlreadyExists(String),

    #[error("Settlement not found: {0}")]
    SettlementNotFound(String),

    #[error("Settlement already completed: {0}")]
    SettlementAlreadyCompleted(SettlementId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("An expense needs at least one participant")]
    NoParticipants,

    #[error("Currency mismatch: group uses {group_currency}, expense is in {expense_currency}")]
    CurrencyMismatch {
        group_currency: String,
        expense_currency: String,
    },

    #[error(
        "Splits sum to {split_total} cents, expected {expense_amount} cents (tolerance {tolerance})"
    )]
    SplitMismatch {
        expense_amount: Cents,
        split_total: Cents,
        tolerance: Cents,
    },

    #[error("Group has {0} unresolved pending settlements")]
    PendingSettlements(usize),

    #[error("Member {member} still has an outstanding balance of {balance} cents")]
    MemberHasBalance { member: String, balance: Cents },

    #[error("Record belongs to a different group: {0}")]
    ForeignRecord(GroupId),

    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),

    #[error(transparent)]
    ImbalancedInput(#[from] ImbalancedInputError),
}
