use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::GroupService;
use crate::domain::{Expense, Group, GroupId, MemberId, Settlement, Split, format_cents};

/// Group snapshot for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub group: Group,
    pub expenses: Vec<Expense>,
    pub splits: Vec<Split>,
    pub settlements: Vec<Settlement>,
}

/// Exporter for converting group data to various formats
pub struct Exporter<'a> {
    service: &'a GroupService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a GroupService) -> Self {
        Self { service }
    }

    /// Export member balances to CSV format
    pub fn export_balances_csv<W: Write>(&self, group_id: GroupId, writer: W) -> Result<usize> {
        let entries = self.service.balances(group_id)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["member", "balance"])?;

        for entry in &entries {
            csv_writer.write_record([entry.name.clone(), format_cents(entry.net_cents)])?;
        }

        csv_writer.flush()?;
        Ok(entries.len())
    }

    /// Export settlement records to CSV format
    pub fn export_settlements_csv<W: Write>(&self, group_id: GroupId, writer: W) -> Result<usize> {
        let settlements = self.service.list_settlements(group_id, true)?;
        let names = self.service.member_names(group_id)?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["from", "to", "amount", "status", "created_at"])?;

        for settlement in &settlements {
            csv_writer.write_record([
                display_name(&names, settlement.from_member),
                display_name(&names, settlement.to_member),
                format_cents(settlement.amount_cents),
                settlement.status.as_str().to_string(),
                settlement.created_at.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(settlements.len())
    }

    /// Export a full group as a JSON snapshot
    pub fn export_group_json<W: Write>(
        &self,
        group_id: GroupId,
        mut writer: W,
    ) -> Result<GroupSnapshot> {
        let ledger = self.service.ledger(group_id)?;

        let snapshot = GroupSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            group: ledger.group,
            expenses: ledger.expenses,
            splits: ledger.splits,
            settlements: ledger.settlements,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

fn display_name(names: &HashMap<MemberId, String>, member_id: MemberId) -> String {
    names
        .get(&member_id)
        .cloned()
        .unwrap_or_else(|| member_id.to_string())
}
