use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GroupId = Uuid;
pub type MemberId = Uuid;

/// Someone who takes part in a group's expenses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            joined_at: Utc::now(),
        }
    }
}

/// A shared context in which members log joint expenses. Every expense in
/// a group is denominated in the group's single currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub currency: String,
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: impl Into<String>, currency: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            currency: currency.to_uppercase(),
            members: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Add a member by name. Returns `None` when the name is already taken
    /// within the group.
    pub fn add_member(&mut self, name: impl Into<String>) -> Option<&Member> {
        let name = name.into();
        if self.member_named(&name).is_some() {
            return None;
        }
        self.members.push(Member::new(name));
        self.members.last()
    }

    pub fn member_named(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.member(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_member() {
        let mut group = Group::new("Flat", "eur");
        assert_eq!(group.currency, "EUR");

        let id = group.add_member("ada").unwrap().id;
        assert!(group.contains(id));
        assert_eq!(group.member_named("ada").map(|m| m.id), Some(id));
    }

    #[test]
    fn test_duplicate_member_name_is_rejected() {
        let mut group = Group::new("Flat", "EUR");
        group.add_member("ada").unwrap();
        assert!(group.add_member("ada").is_none());
        assert_eq!(group.members.len(), 1);
    }

    #[test]
    fn test_unknown_member() {
        let group = Group::new("Flat", "EUR");
        assert!(!group.contains(Uuid::new_v4()));
        assert!(group.member_named("grace").is_none());
    }
}
