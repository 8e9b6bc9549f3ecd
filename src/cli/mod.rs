use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::application::GroupService;
use crate::domain::{MemberId, format_cents};
use crate::io::{Exporter, ImportOptions, Importer};

/// Divido - Shared Expense Ledger
#[derive(Parser)]
#[command(name = "divido")]
#[command(about = "Compute group balances and settlement plans from a CSV expense ledger")]
#[command(version)]
pub struct Cli {
    /// Ledger file with one expense per row:
    /// date,payer,amount,currency,description,participants
    #[arg(short, long)]
    pub file: PathBuf,

    /// Group name used in output
    #[arg(long, default_value = "ledger")]
    pub group: String,

    /// Currency of the ledger
    #[arg(long, default_value = "EUR")]
    pub currency: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show each member's net balance
    Balances {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Propose transfers that settle all debts
    Settle {
        /// Write the proposed transfers to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify ledger integrity
    Check,

    /// Export the ledger as a JSON snapshot
    Export {
        /// Destination file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        if self.verbose {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("divido=debug")),
                )
                .init();
        }

        let service = GroupService::new();
        let importer = Importer::new(&service);

        let file = File::open(&self.file)
            .with_context(|| format!("cannot open ledger file {}", self.file.display()))?;
        let outcome =
            importer.import_group_csv(&self.group, &self.currency, file, ImportOptions::default())?;
        if !outcome.errors.is_empty() {
            for error in &outcome.errors {
                match &error.field {
                    Some(field) => eprintln!("line {} ({}): {}", error.line, field, error.error),
                    None => eprintln!("line {}: {}", error.line, error.error),
                }
            }
            bail!(
                "{} of {} ledger rows could not be imported",
                outcome.errors.len(),
                outcome.errors.len() + outcome.imported
            );
        }

        let group_id = outcome.group.id;
        match self.command {
            Commands::Balances { json } => {
                let entries = service.balances(group_id)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                } else {
                    for entry in &entries {
                        println!("{:<20} {:>12}", entry.name, format_cents(entry.net_cents));
                    }
                }
            }

            Commands::Settle { output } => {
                let settlements = service.settle(group_id)?;
                if settlements.is_empty() {
                    println!("All balances are settled.");
                } else {
                    let names = service.member_names(group_id)?;
                    for settlement in &settlements {
                        println!(
                            "{} pays {} {}",
                            name_of(&names, settlement.from_member),
                            name_of(&names, settlement.to_member),
                            format_cents(settlement.amount_cents)
                        );
                    }
                }
                if let Some(path) = output {
                    let file = File::create(&path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    Exporter::new(&service).export_settlements_csv(group_id, file)?;
                    println!(
                        "Wrote {} proposed transfers to {}",
                        settlements.len(),
                        path.display()
                    );
                }
            }

            Commands::Check => {
                let report = service.check(group_id)?;
                println!(
                    "{} expenses, {} splits, net total {}",
                    report.expense_count,
                    report.split_count,
                    format_cents(report.net_total)
                );
                if report.is_ok() {
                    println!("Ledger is consistent.");
                } else {
                    for issue in &report.issues {
                        println!("- {issue}");
                    }
                    bail!("ledger failed {} integrity checks", report.issues.len());
                }
            }

            Commands::Export { output } => match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("cannot create {}", path.display()))?;
                    Exporter::new(&service).export_group_json(group_id, file)?;
                    println!("Exported snapshot to {}", path.display());
                }
                None => {
                    let stdout = std::io::stdout();
                    Exporter::new(&service).export_group_json(group_id, stdout.lock())?;
                }
            },
        }

        Ok(())
    }
}

fn name_of(names: &HashMap<MemberId, String>, member_id: MemberId) -> String {
    names
        .get(&member_id)
        .cloned()
        .unwrap_or_else(|| member_id.to_string())
}
