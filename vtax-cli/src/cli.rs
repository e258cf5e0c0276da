use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use vtax_core::Role;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Tax desk for a used-vehicle dealership.
///
/// Works out levy, VAT and sold price for stock vehicles, keeps one tax
/// record per vehicle, prints tax payment invoices and tracks expenses.
#[derive(Debug, Parser)]
#[command(name = "vtax", version, about)]
pub struct Cli {
    /// Configuration file (default: ./vtax.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database backend to use ("sqlite" or "memory").
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `dealer.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log filter, e.g. "debug" or "vtax_core=trace". Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also append logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Hide console logs (the log file, if any, still receives them).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Vehicle stock.
    #[command(subcommand)]
    Vehicles(VehiclesCommand),

    /// Tax records and invoices.
    #[command(subcommand)]
    Tax(TaxCommand),

    /// Dealership expenses.
    Expenses(ExpensesArgs),
}

#[derive(Debug, Subcommand)]
pub enum VehiclesCommand {
    /// Import or update vehicles from a CSV export.
    Import {
        /// CSV file with a header row.
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum TaxCommand {
    /// Find vehicles by partial chassis number.
    Search { query: String },

    /// List the most recently added available vehicles.
    Available,

    /// Work out the tax figures for a vehicle.
    Compute(ComputeArgs),

    /// Show the saved tax record for a vehicle.
    Show { chassis: String },

    /// Delete the saved tax record for a vehicle. The vehicle is kept.
    Delete { chassis: String },

    /// Write the tax payment invoice for a saved record.
    Invoice { chassis: String },
}

#[derive(Debug, Clone, Args)]
pub struct ComputeArgs {
    pub chassis: String,

    /// Expected profit. Defaults to the saved record's value.
    #[arg(long, allow_hyphen_values = true)]
    pub profit: Option<String>,

    /// VAT already paid. Defaults to the saved record's value, else zero.
    #[arg(long)]
    pub paid_vat: Option<String>,

    /// Save the figures as the vehicle's tax record.
    #[arg(long)]
    pub save: bool,

    /// Save and write the invoice.
    #[arg(long)]
    pub invoice: bool,
}

#[derive(Debug, Args)]
pub struct ExpensesArgs {
    /// Who is acting.
    #[arg(long, global = true, default_value = "cli")]
    pub user: String,

    /// Role of the acting user ("admin" or "staff").
    #[arg(long, global = true, default_value = "staff", value_parser = parse_role)]
    pub role: Role,

    #[command(subcommand)]
    pub command: ExpensesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ExpensesCommand {
    /// Record an expense.
    Add {
        description: String,
        amount: String,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List one day's expenses, newest first.
    Today {
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete an expense by id.
    Delete { id: i64 },

    /// Write the monthly expenses report.
    Report {
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },
}

fn parse_role(s: &str) -> Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("unknown role '{s}' (expected admin or staff)"))
}
