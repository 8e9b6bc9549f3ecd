use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::io::Read;

use crate::application::{AppError, GroupService};
use crate::domain::{Cents, Group, GroupId, MemberId, SplitSpec, parse_cents};
use crate::io::export::GroupSnapshot;

/// Result of an import operation
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub group: Group,
    pub imported: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred while importing one row
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Validate rows without recording anything
    pub dry_run: bool,
}

/// Importer for loading ledger data into a group service
pub struct Importer<'a> {
    service: &'a GroupService,
}

/// Parsed `participants` column of one CSV row.
enum ParsedShares {
    Equal(Vec<String>),
    Exact(Vec<(String, Cents)>),
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a GroupService) -> Self {
        Self { service }
    }

    /// Import a group ledger from CSV, one expense per row:
    /// `date,payer,amount,currency,description,participants`.
    ///
    /// The group and any member named in the file are created on first
    /// appearance. `participants` is a `;`-separated list of member names
    /// for an equal split, or `name=amount` pairs for exact shares. Bad
    /// rows are collected per line instead of aborting the import.
    pub fn import_group_csv<R: Read>(
        &self,
        group_name: &str,
        currency: &str,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportOutcome> {
        let group = self.service.create_group(group_name, currency, &[])?;
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut imported = 0;
        let mut errors = Vec::new();

        for (line_num, result) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let date_str = record.get(0).unwrap_or("");
            let payer_name = record.get(1).unwrap_or("").trim();
            let amount_str = record.get(2).unwrap_or("");
            let row_currency = record.get(3).unwrap_or("").trim();
            let description = record.get(4).and_then(|s| {
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            });
            let participants_raw = record.get(5).unwrap_or("");

            let timestamp = match parse_timestamp(date_str) {
                Ok(ts) => ts,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("date".to_string()),
                        error: format!("Invalid date: {}", e),
                    });
                    continue;
                }
            };

            if payer_name.is_empty() {
                errors.push(ImportError {
                    line,
                    field: Some("payer".to_string()),
                    error: "Missing payer".to_string(),
                });
                continue;
            }

            let amount_cents = match parse_cents(amount_str) {
                Ok(a) if a > 0 => a,
                Ok(a) => {
                    errors.push(ImportError {
                        line,
                        field: Some("amount".to_string()),
                        error: format!("Amount must be positive, got {}", a),
                    });
                    continue;
                }
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("amount".to_string()),
                        error: format!("Invalid amount: {}", e),
                    });
                    continue;
                }
            };

            let shares = match parse_participants(participants_raw) {
                Ok(shares) => shares,
                Err(e) => {
                    errors.push(ImportError {
                        line,
                        field: Some("participants".to_string()),
                        error: e,
                    });
                    continue;
                }
            };

            // Stop before members are created so a dry run stays dry.
            if options.dry_run {
                imported += 1;
                continue;
            }

            let paid_by = self.ensure_member(group.id, payer_name)?;
            let split = match &shares {
                ParsedShares::Equal(names) => {
                    let mut ids = Vec::with_capacity(names.len());
                    for name in names {
                        ids.push(self.ensure_member(group.id, name)?);
                    }
                    SplitSpec::Equal(ids)
                }
                ParsedShares::Exact(pairs) => {
                    let mut resolved = Vec::with_capacity(pairs.len());
                    for (name, share) in pairs {
                        resolved.push((self.ensure_member(group.id, name)?, *share));
                    }
                    SplitSpec::Exact(resolved)
                }
            };

            let row_currency = if row_currency.is_empty() {
                currency
            } else {
                row_currency
            };
            match self.service.add_expense(
                group.id,
                paid_by,
                amount_cents,
                row_currency,
                timestamp,
                description,
                split,
            ) {
                Ok(_) => imported += 1,
                Err(e) => errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("Expense rejected: {}", e),
                }),
            }
        }

        // Refresh so the outcome carries the members created along the way.
        let group = self.service.get_group(group.id)?;
        Ok(ImportOutcome {
            group,
            imported,
            errors,
        })
    }

    /// Restore a full group from a JSON snapshot.
    pub fn import_group_json<R: Read>(&self, reader: R) -> Result<Group> {
        let snapshot: GroupSnapshot = serde_json::from_reader(reader)?;
        let group = self.service.restore_group(
            snapshot.group,
            snapshot.expenses,
            snapshot.splits,
            snapshot.settlements,
        )?;
        Ok(group)
    }

    /// Look a member up by name, creating them on first appearance.
    fn ensure_member(&self, group_id: GroupId, name: &str) -> Result<MemberId, AppError> {
        let group = self.service.get_group(group_id)?;
        if let Some(member) = group.member_named(name) {
            return Ok(member.id);
        }
        Ok(self.service.add_member(group_id, name)?.id)
    }
}

fn parse_participants(raw: &str) -> Result<ParsedShares, String> {
    let entries: Vec<&str> = raw
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if entries.is_empty() {
        return Err("No participants listed".to_string());
    }

    if entries.iter().any(|e| e.contains('=')) {
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some((name, amount)) = entry.split_once('=') else {
                return Err(format!("Mixed equal and exact shares: {:?}", entry));
            };
            let share = parse_cents(amount)
                .map_err(|e| format!("Bad share for {:?}: {}", name.trim(), e))?;
            pairs.push((name.trim().to_string(), share));
        }
        Ok(ParsedShares::Exact(pairs))
    } else {
        Ok(ParsedShares::Equal(
            entries.iter().map(|s| s.to_string()).collect(),
        ))
    }
}

// Helper function to parse timestamp
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try YYYY-MM-DD format
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc());
    }

    anyhow::bail!("Invalid timestamp format: {}", s)
}
