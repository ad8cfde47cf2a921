//! # CLI Commands
//!
//! Every subcommand of `niaga`, grouped by what it touches.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (clap tree, dispatch, shared parsers)
//! ├── catalog.rs    ◄─── consumer, product
//! ├── documents.rs  ◄─── order, invoice, tax-invoice, spd
//! └── ledger.rs     ◄─── totals, next-number, duplicates, report, seed
//! ```
//!
//! ## How Commands Run
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  niaga invoice create --kind sar --consumer <id> --item 2:100000:Semen  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  run(Command::Invoice { .. }, &config)                                  │
//! │         │  opens Database with config.db_config()                       │
//! │         ▼                                                               │
//! │  documents::invoice(&ctx, InvoiceCommand::Create { .. })                │
//! │         │  InvoiceRepository::create(draft, config.scheme(Sar))         │
//! │         ▼                                                               │
//! │  stdout: pretty JSON of the stored Invoice                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records go to stdout as JSON; logs go to stderr.

use anyhow::Context as _;
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Subcommand};
use serde::Serialize;

use niaga_core::{LineDraft, SchemeKind};
use niaga_db::Database;

use crate::config::AppConfig;

mod catalog;
mod documents;
mod ledger;

pub use catalog::{ConsumerCommand, ProductCommand};
pub use documents::{InvoiceCommand, OrderCommand, SpdCommand, TaxInvoiceCommand};

// =============================================================================
// Command Tree
// =============================================================================

#[derive(Subcommand)]
pub enum Command {
    /// Customers billed on invoices
    Consumer {
        #[command(subcommand)]
        command: ConsumerCommand,
    },
    /// Product catalog
    Product {
        #[command(subcommand)]
        command: ProductCommand,
    },
    /// Sales orders
    Order {
        #[command(subcommand)]
        command: OrderCommand,
    },
    /// SAR and KW invoices
    Invoice {
        #[command(subcommand)]
        command: InvoiceCommand,
    },
    /// Tax invoices (faktur pajak)
    TaxInvoice {
        #[command(subcommand)]
        command: TaxInvoiceCommand,
    },
    /// SPD transmittal documents
    Spd {
        #[command(subcommand)]
        command: SpdCommand,
    },
    /// Compute invoice totals without saving anything
    Totals(TotalsArgs),
    /// Preview the next number a scheme would issue
    NextNumber {
        /// sar, kw or spd
        scheme: SchemeKind,
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
    /// List invoice, tax invoice and SO numbers used more than once
    Duplicates,
    /// Ledger summary
    Report {
        /// Also list outstanding orders and invoices without a tax invoice
        #[arg(long)]
        details: bool,
    },
    /// Fill an empty ledger with demo data
    Seed {
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
}

/// Amounts shared by `totals` and `invoice create`.
#[derive(Args, Debug, Clone)]
pub struct AmountArgs {
    /// Line as QTY:PRICE:DESCRIPTION, repeatable
    #[arg(long = "item", value_parser = parse_line, required = true)]
    pub items: Vec<LineDraft>,

    /// Discount (negative) or surcharge (positive)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub negotiation: i64,

    /// Down payment already received
    #[arg(long, default_value_t = 0)]
    pub dp: i64,

    /// Settlement already invoiced
    #[arg(long, default_value_t = 0)]
    pub pelunasan: i64,
}

#[derive(Args, Debug, Clone)]
pub struct TotalsArgs {
    #[command(flatten)]
    pub amounts: AmountArgs,
}

// =============================================================================
// Dispatch
// =============================================================================

/// What every handler needs.
pub struct Context<'a> {
    pub db: &'a Database,
    pub config: &'a AppConfig,
}

/// Runs one subcommand to completion.
pub async fn run(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    // Pure computation, no ledger needed.
    if let Command::Totals(args) = &command {
        return ledger::totals(config, args);
    }

    let db_config = config.db_config()?;
    let path = db_config.database_path.clone();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let db = Database::new(db_config)
        .await
        .with_context(|| format!("Failed to open ledger at {}", path.display()))?;

    let ctx = Context { db: &db, config };
    let result = match command {
        Command::Consumer { command } => catalog::consumer(&ctx, command).await,
        Command::Product { command } => catalog::product(&ctx, command).await,
        Command::Order { command } => documents::order(&ctx, command).await,
        Command::Invoice { command } => documents::invoice(&ctx, command).await,
        Command::TaxInvoice { command } => documents::tax_invoice(&ctx, command).await,
        Command::Spd { command } => documents::spd(&ctx, command).await,
        Command::NextNumber { scheme, year } => ledger::next_number(&ctx, scheme, year).await,
        Command::Duplicates => ledger::duplicates(&ctx).await,
        Command::Report { details } => ledger::report(&ctx, details).await,
        Command::Seed { year } => ledger::seed(&ctx, year).await,
        Command::Totals(_) => Ok(()),
    };

    db.close().await;
    result
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Writes `value` to stdout as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn current_year() -> i32 {
    today().year()
}

/// Parses `QTY:PRICE:DESCRIPTION`, e.g. `2:100000:Semen 50 kg`.
///
/// Only the first two colons split, so descriptions may contain colons.
/// Range checks happen in the repositories.
pub fn parse_line(raw: &str) -> Result<LineDraft, String> {
    let mut parts = raw.splitn(3, ':');
    let (Some(qty), Some(price), Some(description)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected QTY:PRICE:DESCRIPTION, got '{}'", raw));
    };

    let quantity = qty
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("quantity '{}' is not a whole number", qty.trim()))?;
    let price_rupiah = parse_rupiah(price)
        .ok_or_else(|| format!("price '{}' is not a whole Rupiah amount", price.trim()))?;

    let description = description.trim();
    if description.is_empty() {
        return Err("line description is empty".to_string());
    }

    Ok(LineDraft {
        product_id: None,
        description: description.to_string(),
        quantity,
        price_rupiah,
    })
}

/// Whole Rupiah, accepting `.` or `_` as thousands separators (`1.250.000`).
pub fn parse_rupiah(raw: &str) -> Option<i64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '.' && *c != '_').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}
