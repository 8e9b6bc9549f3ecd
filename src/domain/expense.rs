use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, GroupId, MemberId};

pub type ExpenseId = Uuid;

/// One cost paid by a single member on behalf of the group. Expenses are
/// immutable once recorded; the division of the cost lives in [`Split`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub group_id: GroupId,
    /// Amount in cents (always positive)
    pub amount_cents: Cents,
    pub currency: String,
    /// Member who fronted the money
    pub paid_by: MemberId,
    pub description: Option<String>,
    /// When the expense occurred
    pub created_at: DateTime<Utc>,
}

/// The portion of one expense attributed to one member. The splits of an
/// expense must cover its amount, give or take one minor unit of rounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub expense_id: ExpenseId,
    pub member_id: MemberId,
    /// Share in cents (always positive)
    pub amount_cents: Cents,
}

/// How an expense is divided among group members.
#[derive(Debug, Clone)]
pub enum SplitSpec {
    /// Equal shares for the listed participants; leftover cents go to the
    /// earliest participants so shares always cover the amount exactly.
    Equal(Vec<MemberId>),
    /// Explicit per-member shares.
    Exact(Vec<(MemberId, Cents)>),
}

impl Expense {
    pub fn new(
        group_id: GroupId,
        paid_by: MemberId,
        amount_cents: Cents,
        currency: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        assert!(amount_cents > 0, "Expense amount must be positive");
        Self {
            id: Uuid::new_v4(),
            group_id,
            amount_cents,
            currency: currency.to_uppercase(),
            paid_by,
            description: None,
            created_at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Split the amount equally among the participants. When the amount is
    /// not divisible, the first `remainder` participants carry one extra
    /// cent each, so the shares sum to the amount exactly.
    pub fn split_equally(&self, participants: &[MemberId]) -> Vec<Split> {
        assert!(
            !participants.is_empty(),
            "Expense needs at least one participant"
        );
        let count = participants.len() as i64;
        let base = self.amount_cents / count;
        let remainder = (self.amount_cents % count) as usize;

        participants
            .iter()
            .enumerate()
            .map(|(idx, &member_id)| Split {
                expense_id: self.id,
                member_id,
                amount_cents: if idx < remainder { base + 1 } else { base },
            })
            .collect()
    }

    /// Turn explicit `(member, share)` pairs into splits. Validation of
    /// the shares against the expense amount is the caller's job.
    pub fn split_exact(&self, shares: &[(MemberId, Cents)]) -> Vec<Split> {
        shares
            .iter()
            .map(|&(member_id, amount_cents)| Split {
                expense_id: self.id,
                member_id,
                amount_cents,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(count: usize) -> Vec<MemberId> {
        (0..count).map(|_| Uuid::new_v4()).collect()
    }

    fn expense(amount: Cents) -> Expense {
        Expense::new(Uuid::new_v4(), Uuid::new_v4(), amount, "EUR", Utc::now())
    }

    #[test]
    fn test_split_equally_even() {
        let participants = members(3);
        let splits = expense(9000).split_equally(&participants);

        assert_eq!(splits.len(), 3);
        assert!(splits.iter().all(|s| s.amount_cents == 3000));
    }

    #[test]
    fn test_split_equally_distributes_remainder() {
        let participants = members(3);
        let splits = expense(10000).split_equally(&participants);

        let shares: Vec<Cents> = splits.iter().map(|s| s.amount_cents).collect();
        assert_eq!(shares, vec![3334, 3333, 3333]);
        assert_eq!(shares.iter().sum::<Cents>(), 10000);
    }

    #[test]
    fn test_split_exact() {
        let participants = members(2);
        let shares = vec![(participants[0], 1500), (participants[1], 500)];
        let splits = expense(2000).split_exact(&shares);

        assert_eq!(splits[0].member_id, participants[0]);
        assert_eq!(splits[0].amount_cents, 1500);
        assert_eq!(splits[1].amount_cents, 500);
    }

    #[test]
    #[should_panic(expected = "Expense amount must be positive")]
    fn test_expense_requires_positive_amount() {
        expense(0);
    }

    #[test]
    #[should_panic(expected = "at least one participant")]
    fn test_split_equally_requires_participants() {
        expense(100).split_equally(&[]);
    }
}
