use dashmap::DashMap;
use thiserror::Error;

use crate::domain::{Expense, Group, GroupId, Settlement, Split};

/// Everything stored for one group. Keeping the records under a single
/// entry means every read or update sees a consistent snapshot of the
/// group's ledger.
#[derive(Debug, Clone)]
pub struct GroupRecord {
    pub group: Group,
    pub expenses: Vec<Expense>,
    pub splits: Vec<Split>,
    pub settlements: Vec<Settlement>,
}

impl GroupRecord {
    fn new(group: Group) -> Self {
        Self {
            group,
            expenses: Vec::new(),
            splits: Vec::new(),
            settlements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("group {0} does not exist")]
    UnknownGroup(GroupId),
    #[error("group {0} already exists")]
    DuplicateGroup(GroupId),
    #[error("group name already taken: {0}")]
    DuplicateName(String),
}

/// In-memory store backing the group service. Access goes through
/// closures holding the group's entry, so operations on one group are
/// serialized while different groups never contend.
#[derive(Debug, Default)]
pub struct GroupStore {
    groups: DashMap<GroupId, GroupRecord>,
}

impl GroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_group(&self, group: Group) -> Result<(), StoreError> {
        if self.groups.contains_key(&group.id) {
            return Err(StoreError::DuplicateGroup(group.id));
        }
        if self.find_by_name(&group.name).is_some() {
            return Err(StoreError::DuplicateName(group.name));
        }
        self.groups.insert(group.id, GroupRecord::new(group));
        Ok(())
    }

    pub fn find_by_name(&self, name: &str) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|entry| entry.value().group.name == name)
            .map(|entry| *entry.key())
    }

    /// Run `f` against the group's records under its entry lock.
    pub fn read<R>(
        &self,
        id: GroupId,
        f: impl FnOnce(&GroupRecord) -> R,
    ) -> Result<R, StoreError> {
        let record = self.groups.get(&id).ok_or(StoreError::UnknownGroup(id))?;
        Ok(f(&record))
    }

    /// Run `f` with mutable access to the group's records. The entry lock
    /// is held for the whole closure, so a computation over the records
    /// and the write of its result form one atomic step.
    pub fn update<R>(
        &self,
        id: GroupId,
        f: impl FnOnce(&mut GroupRecord) -> R,
    ) -> Result<R, StoreError> {
        let mut record = self.groups.get_mut(&id).ok_or(StoreError::UnknownGroup(id))?;
        Ok(f(&mut record))
    }
}
