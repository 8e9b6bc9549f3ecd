use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use thiserror::Error;

use super::{Cents, Expense, ExpenseId, MINOR_UNIT, MemberId, Split};

/// Net position per member. Positive means the member is owed money,
/// negative means the member owes. Iteration order is first-seen order
/// (payer before that expense's participants), which downstream code
/// relies on for deterministic tie-breaking.
pub type Balances = IndexMap<MemberId, Cents>;

/// How far an expense's splits may drift from its amount. Unequal splits
/// can round away at most one minor unit in total.
pub const SPLIT_TOLERANCE: Cents = MINOR_UNIT;

/// Raised when the expense/split data itself is inconsistent. Callers
/// should treat this as a data-corruption signal, not something to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityError {
    #[error("expense {expense_id} has no splits")]
    MissingSplits { expense_id: ExpenseId },

    #[error(
        "splits for expense {expense_id} sum to {split_total} cents, \
         but the expense amount is {expense_amount} cents"
    )]
    SplitSumMismatch {
        expense_id: ExpenseId,
        expense_amount: Cents,
        split_total: Cents,
    },

    #[error("split references unknown expense {expense_id}")]
    OrphanSplit { expense_id: ExpenseId },
}

/// Compute the net balance of every member touched by the given expenses
/// and splits: each payer is credited the full expense amount, each split
/// participant is debited their share.
///
/// The inputs are expected to be scoped to a single group already; no
/// filtering happens here. Since every credited cent is owed by exactly
/// the split set, the returned balances sum to zero up to the accumulated
/// per-expense rounding tolerance.
pub fn compute_balances(
    expenses: &[Expense],
    splits: &[Split],
) -> Result<Balances, DataIntegrityError> {
    let known: HashSet<ExpenseId> = expenses.iter().map(|e| e.id).collect();
    let mut by_expense: HashMap<ExpenseId, Vec<&Split>> = HashMap::new();
    for split in splits {
        if !known.contains(&split.expense_id) {
            return Err(DataIntegrityError::OrphanSplit {
                expense_id: split.expense_id,
            });
        }
        by_expense.entry(split.expense_id).or_default().push(split);
    }

    let mut balances = Balances::new();
    for expense in expenses {
        let shares = by_expense
            .get(&expense.id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if shares.is_empty() {
            return Err(DataIntegrityError::MissingSplits {
                expense_id: expense.id,
            });
        }

        let split_total: Cents = shares.iter().map(|s| s.amount_cents).sum();
        if (split_total - expense.amount_cents).abs() > SPLIT_TOLERANCE {
            return Err(DataIntegrityError::SplitSumMismatch {
                expense_id: expense.id,
                expense_amount: expense.amount_cents,
                split_total,
            });
        }

        *balances.entry(expense.paid_by).or_insert(0) += expense.amount_cents;
        for split in shares {
            *balances.entry(split.member_id).or_insert(0) -= split.amount_cents;
        }
    }

    Ok(balances)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn member(n: u128) -> MemberId {
        Uuid::from_u128(n)
    }

    fn expense(paid_by: MemberId, amount: Cents) -> Expense {
        Expense::new(Uuid::from_u128(99), paid_by, amount, "EUR", Utc::now())
    }

    #[test]
    fn test_empty_ledger() {
        let balances = compute_balances(&[], &[]).unwrap();
        assert!(balances.is_empty());
    }

    #[test]
    fn test_payer_credited_participants_debited() {
        let (a, b, c) = (member(1), member(2), member(3));
        let dinner = expense(a, 9000);
        let splits = dinner.split_equally(&[a, b, c]);

        let balances = compute_balances(&[dinner], &splits).unwrap();

        assert_eq!(balances[&a], 6000);
        assert_eq!(balances[&b], -3000);
        assert_eq!(balances[&c], -3000);
    }

    #[test]
    fn test_members_appear_in_first_seen_order() {
        let (a, b, c) = (member(1), member(2), member(3));
        let taxi = expense(c, 1200);
        let splits = taxi.split_equally(&[b, a]);

        let balances = compute_balances(&[taxi], &splits).unwrap();

        let order: Vec<MemberId> = balances.keys().copied().collect();
        assert_eq!(order, vec![c, b, a]);
    }

    #[test]
    fn test_self_paid_share_nets_out() {
        let a = member(1);
        let coffee = expense(a, 300);
        let splits = coffee.split_equally(&[a]);

        let balances = compute_balances(&[coffee], &splits).unwrap();

        assert_eq!(balances[&a], 0);
    }

    #[test]
    fn test_one_cent_drift_is_tolerated() {
        let (a, b, c) = (member(1), member(2), member(3));
        let groceries = expense(a, 10000);
        // Hand-rounded shares that fall one cent short of the amount.
        let splits = groceries.split_exact(&[(a, 3333), (b, 3333), (c, 3333)]);

        let balances = compute_balances(&[groceries], &splits).unwrap();

        assert_eq!(balances[&a], 6667);
        assert_eq!(balances.values().sum::<Cents>(), 1);
    }

    #[test]
    fn test_split_sum_mismatch_is_rejected() {
        let (a, b) = (member(1), member(2));
        let rent = expense(a, 10000);
        let splits = rent.split_exact(&[(a, 3000), (b, 3000)]);

        let result = compute_balances(&[rent], &splits);

        assert!(matches!(
            result,
            Err(DataIntegrityError::SplitSumMismatch {
                expense_amount: 10000,
                split_total: 6000,
                ..
            })
        ));
    }

    #[test]
    fn test_expense_without_splits_is_rejected() {
        let rent = expense(member(1), 10000);

        let result = compute_balances(&[rent], &[]);

        assert!(matches!(
            result,
            Err(DataIntegrityError::MissingSplits { .. })
        ));
    }

    #[test]
    fn test_orphan_split_is_rejected() {
        let orphan = Split {
            expense_id: Uuid::from_u128(7),
            member_id: member(1),
            amount_cents: 100,
        };

        let result = compute_balances(&[], &[orphan]);

        assert!(matches!(result, Err(DataIntegrityError::OrphanSplit { .. })));
    }

    #[test]
    fn test_balances_sum_to_zero_across_expenses() {
        let (a, b, c) = (member(1), member(2), member(3));
        let dinner = expense(a, 9000);
        let taxi = expense(b, 2500);
        let mut splits = dinner.split_equally(&[a, b, c]);
        splits.extend(taxi.split_equally(&[a, b]));

        let balances = compute_balances(&[dinner, taxi], &splits).unwrap();

        assert_eq!(balances.values().sum::<Cents>(), 0);
    }
}
