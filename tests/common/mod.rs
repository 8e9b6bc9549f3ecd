// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use divido::application::{BalanceEntry, GroupService};
use divido::domain::{Cents, GroupId, MemberId};

/// Helper to create a service with one group and its members
pub fn test_group(member_names: &[&str]) -> Result<(GroupService, GroupId, Vec<MemberId>)> {
    let service = GroupService::new();
    let group = service.create_group("Trip", "EUR", member_names)?;
    let members = group.members.iter().map(|m| m.id).collect();
    Ok((service, group.id, members))
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Net balance of one member out of a balance listing
pub fn net_of(entries: &[BalanceEntry], member_id: MemberId) -> Cents {
    entries
        .iter()
        .find(|e| e.member_id == member_id)
        .map(|e| e.net_cents)
        .unwrap_or_default()
}
