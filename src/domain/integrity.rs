use std::collections::{HashMap, HashSet};
use std::fmt;

use super::{
    Cents, Expense, ExpenseId, Group, MemberId, SPLIT_TOLERANCE, Split, format_cents,
};

/// Result of auditing a group's raw ledger data. Unlike
/// [`compute_balances`](super::compute_balances), the audit does not stop
/// at the first problem; it collects everything a repair would need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityReport {
    pub expense_count: usize,
    pub split_count: usize,
    /// Sum of all per-expense residues (paid minus owed).
    pub net_total: Cents,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    NonPositiveExpense {
        expense_id: ExpenseId,
        amount: Cents,
    },
    NonPositiveSplit {
        expense_id: ExpenseId,
        member_id: MemberId,
        amount: Cents,
    },
    UnknownMember {
        member_id: MemberId,
    },
    CurrencyMismatch {
        expense_id: ExpenseId,
        currency: String,
    },
    MissingSplits {
        expense_id: ExpenseId,
    },
    SplitSumMismatch {
        expense_id: ExpenseId,
        expense_amount: Cents,
        split_total: Cents,
    },
    OrphanSplit {
        expense_id: ExpenseId,
    },
    Imbalance {
        net: Cents,
        tolerance: Cents,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::NonPositiveExpense { expense_id, amount } => {
                write!(
                    f,
                    "expense {expense_id} has non-positive amount {}",
                    format_cents(*amount)
                )
            }
            IntegrityIssue::NonPositiveSplit {
                expense_id,
                member_id,
                amount,
            } => write!(
                f,
                "split of expense {expense_id} for member {member_id} has non-positive amount {}",
                format_cents(*amount)
            ),
            IntegrityIssue::UnknownMember { member_id } => {
                write!(f, "member {member_id} is not part of the group")
            }
            IntegrityIssue::CurrencyMismatch {
                expense_id,
                currency,
            } => write!(
                f,
                "expense {expense_id} is denominated in {currency}, not the group currency"
            ),
            IntegrityIssue::MissingSplits { expense_id } => {
                write!(f, "expense {expense_id} has no splits")
            }
            IntegrityIssue::SplitSumMismatch {
                expense_id,
                expense_amount,
                split_total,
            } => write!(
                f,
                "splits of expense {expense_id} sum to {} instead of {}",
                format_cents(*split_total),
                format_cents(*expense_amount)
            ),
            IntegrityIssue::OrphanSplit { expense_id } => {
                write!(f, "split references unknown expense {expense_id}")
            }
            IntegrityIssue::Imbalance { net, tolerance } => write!(
                f,
                "ledger is out of balance by {} (tolerance {})",
                format_cents(*net),
                format_cents(*tolerance)
            ),
        }
    }
}

/// Audit expenses and splits against their group. Checks everything the
/// balance engine assumes: positive amounts, known members, one currency,
/// splits that exist and cover their expense, and an overall net total
/// inside the accumulated rounding tolerance.
pub fn check_integrity(group: &Group, expenses: &[Expense], splits: &[Split]) -> IntegrityReport {
    let mut issues = Vec::new();

    let known: HashSet<ExpenseId> = expenses.iter().map(|e| e.id).collect();
    let mut split_totals: HashMap<ExpenseId, Cents> = HashMap::new();
    for split in splits {
        if !known.contains(&split.expense_id) {
            issues.push(IntegrityIssue::OrphanSplit {
                expense_id: split.expense_id,
            });
            continue;
        }
        if split.amount_cents <= 0 {
            issues.push(IntegrityIssue::NonPositiveSplit {
                expense_id: split.expense_id,
                member_id: split.member_id,
                amount: split.amount_cents,
            });
        }
        if !group.contains(split.member_id) {
            issues.push(IntegrityIssue::UnknownMember {
                member_id: split.member_id,
            });
        }
        *split_totals.entry(split.expense_id).or_insert(0) += split.amount_cents;
    }

    let mut net_total: Cents = 0;
    for expense in expenses {
        if expense.amount_cents <= 0 {
            issues.push(IntegrityIssue::NonPositiveExpense {
                expense_id: expense.id,
                amount: expense.amount_cents,
            });
        }
        if !expense.currency.eq_ignore_ascii_case(&group.currency) {
            issues.push(IntegrityIssue::CurrencyMismatch {
                expense_id: expense.id,
                currency: expense.currency.clone(),
            });
        }
        if !group.contains(expense.paid_by) {
            issues.push(IntegrityIssue::UnknownMember {
                member_id: expense.paid_by,
            });
        }
        match split_totals.get(&expense.id) {
            None => issues.push(IntegrityIssue::MissingSplits {
                expense_id: expense.id,
            }),
            Some(&split_total) => {
                if (split_total - expense.amount_cents).abs() > SPLIT_TOLERANCE {
                    issues.push(IntegrityIssue::SplitSumMismatch {
                        expense_id: expense.id,
                        expense_amount: expense.amount_cents,
                        split_total,
                    });
                }
                net_total += expense.amount_cents - split_total;
            }
        }
    }

    let tolerance = expenses.len() as Cents * SPLIT_TOLERANCE;
    if net_total.abs() > tolerance {
        issues.push(IntegrityIssue::Imbalance {
            net: net_total,
            tolerance,
        });
    }

    IntegrityReport {
        expense_count: expenses.len(),
        split_count: splits.len(),
        net_total,
        issues,
    }
}
