//! # Seed Data Generator
//!
//! Populates a database with a demo ledger for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p niaga-db --bin seed
//! cargo run -p niaga-db --bin seed -- --db ./data/niaga.db --year 2026
//! ```

use chrono::{Datelike, Utc};
use niaga_db::seed::seed_demo;
use niaga_db::{Database, DbConfig};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = "./niaga_dev.db".to_string();
    let mut year = Utc::now().year();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--year" | "-y" => {
                if i + 1 < args.len() {
                    year = args[i + 1].parse().unwrap_or(year);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Niaga Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./niaga_dev.db)");
                println!("  -y, --year <YYYY>  Year for document dates (default: current year)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Niaga Seed Data Generator");
    println!("=========================");
    println!("Database: {}", db_path);
    println!("Year:     {}", year);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let summary = seed_demo(&db, year).await?;
    if summary.skipped {
        println!("⚠ Database already has data; delete the file to regenerate.");
        return Ok(());
    }

    println!("✓ {} consumers, {} products", summary.consumers, summary.products);
    println!("✓ {} sales orders", summary.sales_orders);
    println!(
        "✓ {} invoices, {} tax invoices, {} SPD",
        summary.invoices, summary.tax_invoices, summary.spd_documents
    );

    let report = db.snapshot().await?.duplicate_report();
    println!();
    println!("Duplicate groups: {}", report.group_count());
    println!("✓ Seed complete!");

    Ok(())
}
