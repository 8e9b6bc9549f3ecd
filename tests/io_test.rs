mod common;

use std::fs::File;
use std::io::Cursor;

use anyhow::Result;
use common::net_of;
use divido::application::GroupService;
use divido::io::{Exporter, ImportOptions, Importer};
use tempfile::TempDir;

const LEDGER: &str = "\
date,payer,amount,currency,description,participants
2026-05-01,ada,90.00,EUR,dinner,ada;bob;eve
2026-05-02,bob,30.00,EUR,taxi,ada;bob
2026-05-03,ada,20.00,EUR,museum,ada=5.00;bob=15.00
";

#[test]
fn test_import_group_csv() -> Result<()> {
    let service = GroupService::new();
    let importer = Importer::new(&service);

    let outcome = importer.import_group_csv(
        "trip",
        "EUR",
        Cursor::new(LEDGER),
        ImportOptions::default(),
    )?;

    assert_eq!(outcome.imported, 3);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.group.members.len(), 3);

    let ada = outcome.group.member_named("ada").unwrap().id;
    let bob = outcome.group.member_named("bob").unwrap().id;
    let eve = outcome.group.member_named("eve").unwrap().id;

    let balances = service.balances(outcome.group.id)?;
    assert_eq!(net_of(&balances, ada), 6000);
    assert_eq!(net_of(&balances, bob), -3000);
    assert_eq!(net_of(&balances, eve), -3000);
    Ok(())
}

#[test]
fn test_import_collects_row_errors() -> Result<()> {
    let ledger = "\
date,payer,amount,currency,description,participants
2026-05-01,ada,abc,EUR,bad amount,ada;bob
not-a-date,ada,10.00,EUR,bad date,ada;bob
2026-05-03,ada,10.00,EUR,nobody,
2026-05-04,ada,10.00,USD,wrong currency,ada;bob
2026-05-05,ada,10.00,EUR,fine,ada;bob
";
    let service = GroupService::new();
    let importer = Importer::new(&service);

    let outcome = importer.import_group_csv(
        "trip",
        "EUR",
        Cursor::new(ledger),
        ImportOptions::default(),
    )?;

    assert_eq!(outcome.imported, 1);
    assert_eq!(outcome.errors.len(), 4);

    let fields: Vec<Option<&str>> = outcome
        .errors
        .iter()
        .map(|e| e.field.as_deref())
        .collect();
    assert_eq!(
        fields,
        vec![
            Some("amount"),
            Some("date"),
            Some("participants"),
            None, // currency mismatch surfaces as a rejected expense
        ]
    );
    assert_eq!(outcome.errors[0].line, 2);
    Ok(())
}

#[test]
fn test_dry_run_records_nothing() -> Result<()> {
    let service = GroupService::new();
    let importer = Importer::new(&service);

    let outcome = importer.import_group_csv(
        "trip",
        "EUR",
        Cursor::new(LEDGER),
        ImportOptions { dry_run: true },
    )?;

    assert_eq!(outcome.imported, 3);
    assert!(outcome.group.members.is_empty());
    assert!(service.list_expenses(outcome.group.id)?.is_empty());
    Ok(())
}

#[test]
fn test_export_settlements_csv() -> Result<()> {
    let service = GroupService::new();
    let importer = Importer::new(&service);
    let outcome = importer.import_group_csv(
        "trip",
        "EUR",
        Cursor::new(LEDGER),
        ImportOptions::default(),
    )?;
    service.settle(outcome.group.id)?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service).export_settlements_csv(outcome.group.id, &mut buffer)?;

    assert_eq!(count, 2);
    let csv = String::from_utf8(buffer)?;
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("from,to,amount,status,created_at"));
    assert!(csv.contains("bob,ada,30.00,pending"));
    assert!(csv.contains("eve,ada,30.00,pending"));
    Ok(())
}

#[test]
fn test_export_balances_csv() -> Result<()> {
    let service = GroupService::new();
    let importer = Importer::new(&service);
    let outcome = importer.import_group_csv(
        "trip",
        "EUR",
        Cursor::new(LEDGER),
        ImportOptions::default(),
    )?;

    let mut buffer = Vec::new();
    let count = Exporter::new(&service).export_balances_csv(outcome.group.id, &mut buffer)?;

    assert_eq!(count, 3);
    let csv = String::from_utf8(buffer)?;
    assert!(csv.contains("ada,60.00"));
    assert!(csv.contains("bob,-30.00"));
    Ok(())
}

#[test]
fn test_snapshot_round_trip() -> Result<()> {
    let source = GroupService::new();
    let importer = Importer::new(&source);
    let outcome = importer.import_group_csv(
        "trip",
        "EUR",
        Cursor::new(LEDGER),
        ImportOptions::default(),
    )?;
    let group_id = outcome.group.id;
    let settlements = source.settle(group_id)?;
    source.complete_settlement(group_id, settlements[0].id)?;

    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("trip.json");
    Exporter::new(&source).export_group_json(group_id, File::create(&path)?)?;

    let target = GroupService::new();
    let restored = Importer::new(&target).import_group_json(File::open(&path)?)?;

    assert_eq!(restored.id, group_id);
    assert_eq!(target.balances(group_id)?, source.balances(group_id)?);
    assert_eq!(target.list_settlements(group_id, true)?.len(), 2);
    assert_eq!(target.list_settlements(group_id, false)?.len(), 1);
    Ok(())
}
