use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    Balances, Cents, Expense, Group, GroupId, Member, MemberId, ProposedTransfer,
    SETTLEMENT_EPSILON, SPLIT_TOLERANCE, Settlement, SettlementId, Split, SplitSpec,
    IntegrityReport, apply_transfers, check_integrity, compute_balances, format_cents,
    plan_settlements,
};
use crate::storage::{GroupRecord, GroupStore};

use super::AppError;

/// Application service providing high-level operations over shared
/// expense groups: recording expenses, deriving balances, planning and
/// tracking settlements.
#[derive(Debug, Default)]
pub struct GroupService {
    store: GroupStore,
}

/// Result of recording an expense
pub struct ExpenseResult {
    pub expense: Expense,
    pub splits: Vec<Split>,
}

/// Net position of one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceEntry {
    pub member_id: MemberId,
    pub name: String,
    pub net_cents: Cents,
}

/// Full clone of a group's records, for export and inspection
pub struct GroupLedger {
    pub group: Group,
    pub expenses: Vec<Expense>,
    pub splits: Vec<Split>,
    pub settlements: Vec<Settlement>,
}

impl GroupService {
    /// Create a service over a fresh in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================
    // Group & member operations
    // ========================

    /// Create a new group with the given members.
    pub fn create_group(
        &self,
        name: &str,
        currency: &str,
        member_names: &[&str],
    ) -> Result<Group, AppError> {
        let mut group = Group::new(name, currency);
        for member_name in member_names {
            if group.add_member(*member_name).is_none() {
                return Err(AppError::MemberAlreadyExists(member_name.to_string()));
            }
        }

        self.store
            .insert_group(group.clone())
            .map_err(|_| AppError::GroupAlreadyExists(name.to_string()))?;

        tracing::info!(group = name, members = group.members.len(), "group created");
        Ok(group)
    }

    /// Get a group by id.
    pub fn get_group(&self, group_id: GroupId) -> Result<Group, AppError> {
        self.store
            .read(group_id, |record| record.group.clone())
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))
    }

    /// Get a group by name.
    pub fn find_group(&self, name: &str) -> Result<Group, AppError> {
        let group_id = self
            .store
            .find_by_name(name)
            .ok_or_else(|| AppError::GroupNotFound(name.to_string()))?;
        self.get_group(group_id)
    }

    /// Add a member to an existing group.
    pub fn add_member(&self, group_id: GroupId, name: &str) -> Result<Member, AppError> {
        self.store
            .update(group_id, |record| match record.group.add_member(name) {
                Some(member) => Ok(member.clone()),
                None => Err(AppError::MemberAlreadyExists(name.to_string())),
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))?
    }

    /// Remove a member from a group. Refused while the member still has an
    /// outstanding balance or any pending settlement implicates them.
    pub fn remove_member(&self, group_id: GroupId, member_id: MemberId) -> Result<Member, AppError> {
        self.store
            .update(group_id, |record| {
                let Some(idx) = record.group.members.iter().position(|m| m.id == member_id)
                else {
                    return Err(AppError::MemberNotFound(member_id.to_string()));
                };

                let implicated = record
                    .settlements
                    .iter()
                    .filter(|s| s.is_pending() && s.involves(member_id))
                    .count();
                if implicated > 0 {
                    return Err(AppError::PendingSettlements(implicated));
                }

                let balances = effective_balances(record)?;
                let net = balances.get(&member_id).copied().unwrap_or(0);
                if net.abs() > SETTLEMENT_EPSILON {
                    return Err(AppError::MemberHasBalance {
                        member: record.group.members[idx].name.clone(),
                        balance: net,
                    });
                }

                let member = record.group.members.remove(idx);
                tracing::info!(
                    group = %record.group.name,
                    member = %member.name,
                    "member left group"
                );
                Ok(member)
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))?
    }

    /// Get a map of member IDs to names (useful for display).
    pub fn member_names(&self, group_id: GroupId) -> Result<HashMap<MemberId, String>, AppError> {
        let group = self.get_group(group_id)?;
        Ok(group
            .members
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect())
    }

    // ========================
    // Expense operations
    // ========================

    /// Record a new expense and its splits.
    #[allow(clippy::too_many_arguments)]
    pub fn add_expense(
        &self,
        group_id: GroupId,
        paid_by: MemberId,
        amount_cents: Cents,
        currency: &str,
        timestamp: DateTime<Utc>,
        description: Option<String>,
        split: SplitSpec,
    ) -> Result<ExpenseResult, AppError> {
        if amount_cents <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "expense amount must be positive, got {}",
                format_cents(amount_cents)
            )));
        }

        self.store
            .update(group_id, |record| {
                if !currency.eq_ignore_ascii_case(&record.group.currency) {
                    return Err(AppError::CurrencyMismatch {
                        group_currency: record.group.currency.clone(),
                        expense_currency: currency.to_uppercase(),
                    });
                }
                if !record.group.contains(paid_by) {
                    return Err(AppError::MemberNotFound(paid_by.to_string()));
                }

                let mut expense = Expense::new(
                    record.group.id,
                    paid_by,
                    amount_cents,
                    &record.group.currency,
                    timestamp,
                );
                if let Some(description) = description {
                    expense = expense.with_description(description);
                }

                let splits = match &split {
                    SplitSpec::Equal(participants) => {
                        if participants.is_empty() {
                            return Err(AppError::NoParticipants);
                        }
                        for id in participants {
                            if !record.group.contains(*id) {
                                return Err(AppError::MemberNotFound(id.to_string()));
                            }
                        }
                        expense.split_equally(participants)
                    }
                    SplitSpec::Exact(shares) => {
                        if shares.is_empty() {
                            return Err(AppError::NoParticipants);
                        }
                        for (id, share) in shares {
                            if !record.group.contains(*id) {
                                return Err(AppError::MemberNotFound(id.to_string()));
                            }
                            if *share <= 0 {
                                return Err(AppError::InvalidAmount(format!(
                                    "share must be positive, got {}",
                                    format_cents(*share)
                                )));
                            }
                        }
                        let split_total: Cents = shares.iter().map(|(_, share)| *share).sum();
                        if (split_total - amount_cents).abs() > SPLIT_TOLERANCE {
                            return Err(AppError::SplitMismatch {
                                expense_amount: amount_cents,
                                split_total,
                                tolerance: SPLIT_TOLERANCE,
                            });
                        }
                        expense.split_exact(shares)
                    }
                };

                record.expenses.push(expense.clone());
                record.splits.extend(splits.iter().cloned());
                tracing::debug!(
                    group = %record.group.name,
                    amount = %format_cents(amount_cents),
                    participants = splits.len(),
                    "expense recorded"
                );
                Ok(ExpenseResult { expense, splits })
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))?
    }

    /// List all expenses of a group, oldest first.
    pub fn list_expenses(&self, group_id: GroupId) -> Result<Vec<Expense>, AppError> {
        self.store
            .read(group_id, |record| record.expenses.clone())
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))
    }

    // ========================
    // Balance & settlement operations
    // ========================

    /// Net balance of every current member, in join order. Completed
    /// settlements count as repayments on top of the expense history.
    pub fn balances(&self, group_id: GroupId) -> Result<Vec<BalanceEntry>, AppError> {
        self.store
            .read(group_id, |record| {
                let balances = effective_balances(record)?;
                Ok(balances
                    .iter()
                    .map(|(&member_id, &net_cents)| BalanceEntry {
                        member_id,
                        name: member_display_name(&record.group, member_id),
                        net_cents,
                    })
                    .collect())
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))?
    }

    /// Plan settlements for the group's current balances and persist the
    /// proposals as pending records. Refused while earlier proposals are
    /// still pending, so two plans can never be in flight at once.
    pub fn settle(&self, group_id: GroupId) -> Result<Vec<Settlement>, AppError> {
        self.store
            .update(group_id, |record| {
                let pending = record.settlements.iter().filter(|s| s.is_pending()).count();
                if pending > 0 {
                    return Err(AppError::PendingSettlements(pending));
                }

                let balances = effective_balances(record)?;
                let transfers = plan_settlements(&balances)?;
                let settlements: Vec<Settlement> = transfers
                    .iter()
                    .map(|t| Settlement::new(record.group.id, t.from, t.to, t.amount_cents))
                    .collect();
                record.settlements.extend(settlements.iter().cloned());

                tracing::info!(
                    group = %record.group.name,
                    transfers = settlements.len(),
                    "settlement plan recorded"
                );
                Ok(settlements)
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))?
    }

    /// Mark a pending settlement as paid.
    pub fn complete_settlement(
        &self,
        group_id: GroupId,
        settlement_id: SettlementId,
    ) -> Result<Settlement, AppError> {
        self.store
            .update(group_id, |record| {
                let Some(settlement) = record
                    .settlements
                    .iter_mut()
                    .find(|s| s.id == settlement_id)
                else {
                    return Err(AppError::SettlementNotFound(settlement_id.to_string()));
                };
                if !settlement.complete() {
                    return Err(AppError::SettlementAlreadyCompleted(settlement_id));
                }
                tracing::info!(
                    group = %record.group.name,
                    settlement = %settlement_id,
                    "settlement completed"
                );
                Ok(settlement.clone())
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))?
    }

    /// List the group's settlement records, oldest first.
    pub fn list_settlements(
        &self,
        group_id: GroupId,
        include_completed: bool,
    ) -> Result<Vec<Settlement>, AppError> {
        self.store
            .read(group_id, |record| {
                record
                    .settlements
                    .iter()
                    .filter(|s| include_completed || s.is_pending())
                    .cloned()
                    .collect()
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))
    }

    // ========================
    // Integrity & snapshots
    // ========================

    /// Audit the group's ledger data and return a report.
    pub fn check(&self, group_id: GroupId) -> Result<IntegrityReport, AppError> {
        self.store
            .read(group_id, |record| {
                check_integrity(&record.group, &record.expenses, &record.splits)
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))
    }

    /// Full clone of the group's records.
    pub fn ledger(&self, group_id: GroupId) -> Result<GroupLedger, AppError> {
        self.store
            .read(group_id, |record| GroupLedger {
                group: record.group.clone(),
                expenses: record.expenses.clone(),
                splits: record.splits.clone(),
                settlements: record.settlements.clone(),
            })
            .map_err(|_| AppError::GroupNotFound(group_id.to_string()))
    }

    /// Re-insert a previously exported group. The records are validated
    /// against the group and the balance engine before anything is stored.
    pub fn restore_group(
        &self,
        group: Group,
        expenses: Vec<Expense>,
        splits: Vec<Split>,
        settlements: Vec<Settlement>,
    ) -> Result<Group, AppError> {
        for expense in &expenses {
            if expense.group_id != group.id {
                return Err(AppError::ForeignRecord(expense.group_id));
            }
            if !group.contains(expense.paid_by) {
                return Err(AppError::MemberNotFound(expense.paid_by.to_string()));
            }
        }
        for split in &splits {
            if !group.contains(split.member_id) {
                return Err(AppError::MemberNotFound(split.member_id.to_string()));
            }
        }
        for settlement in &settlements {
            if settlement.group_id != group.id {
                return Err(AppError::ForeignRecord(settlement.group_id));
            }
        }
        compute_balances(&expenses, &splits)?;

        self.store
            .insert_group(group.clone())
            .map_err(|_| AppError::GroupAlreadyExists(group.name.clone()))?;
        self.store
            .update(group.id, |record| {
                record.expenses = expenses;
                record.splits = splits;
                record.settlements = settlements;
            })
            .map_err(|_| AppError::GroupNotFound(group.id.to_string()))?;

        tracing::info!(group = %group.name, "group restored from snapshot");
        Ok(group)
    }
}

/// Balances the rest of the system reads: engine output over the expense
/// history, seeded with every current member at zero (join order), with
/// completed settlements applied as repayments.
fn effective_balances(record: &GroupRecord) -> Result<Balances, AppError> {
    let mut balances: Balances = record.group.members.iter().map(|m| (m.id, 0)).collect();

    let computed = compute_balances(&record.expenses, &record.splits)?;
    for (member_id, net) in computed {
        *balances.entry(member_id).or_insert(0) += net;
    }

    let repayments: Vec<ProposedTransfer> = record
        .settlements
        .iter()
        .filter(|s| !s.is_pending())
        .map(ProposedTransfer::from)
        .collect();
    apply_transfers(&mut balances, &repayments);

    // Members who settled up and left stay out of the picture; only a
    // residue above the tolerance would keep them visible.
    balances.retain(|member_id, net| {
        record.group.contains(*member_id) || net.abs() > SETTLEMENT_EPSILON
    });

    Ok(balances)
}

fn member_display_name(group: &Group, member_id: MemberId) -> String {
    group
        .member(member_id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| member_id.to_string())
}
