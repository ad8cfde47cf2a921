//! # niaga: Command Line Back Office
//!
//! Entry point for the `niaga` binary.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Startup Sequence                                 │
//! │                                                                         │
//! │  1. Parse arguments (clap)                                              │
//! │     └── --config, --db, subcommand                                      │
//! │                                                                         │
//! │  2. Load configuration (stderr logging at the default filter)           │
//! │     └── defaults → config.toml → NIAGA_* env → validate                 │
//! │                                                                         │
//! │  3. Initialize tracing                                                  │
//! │     └── RUST_LOG, else logging.filter, else info,niaga=debug,sqlx=warn  │
//! │                                                                         │
//! │  4. Run the subcommand                                                  │
//! │     └── opens the ledger (WAL, migrations) unless it is `totals`        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//! ```text
//! niaga seed
//! niaga invoice create --kind sar --consumer <id> --item "2:100000:Semen 50 kg"
//! niaga next-number kw --year 2026
//! niaga duplicates
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::Command;
use config::{AppConfig, DEFAULT_LOG_FILTER};

#[derive(Parser)]
#[command(name = "niaga", version)]
#[command(about = "Invoices, sales orders, tax invoices and SPD documents")]
struct Cli {
    /// Config file (default: platform config dir / config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger database file, overrides the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }

    init_tracing(config.log_filter());
    debug!(db = ?config.database_path(), regime = %config.tax.regime, "Configuration loaded");

    commands::run(cli.command, &config).await
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=niaga_db=trace` - Show trace for the database crate only
/// - Default: `logging.filter` from config, else `info,niaga=debug,sqlx=warn`
fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(std::io::stderr)
        .init();
}

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Loads the config before the global subscriber exists. File and
/// override messages go to stderr at the default filter.
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    with_bootstrap_logging(env_filter(DEFAULT_LOG_FILTER), std::io::stderr, || {
        AppConfig::load(path)
    })
    .context("Failed to load configuration")
}

/// Runs `f` under a scoped fmt subscriber writing to `writer`.
fn with_bootstrap_logging<W, T>(filter: EnvFilter, writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'w> MakeWriter<'w> for Captured {
        type Writer = Captured;

        fn make_writer(&'w self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_override_warnings_reach_bootstrap_logging() {
        let captured = Captured::default();

        let config = with_bootstrap_logging(EnvFilter::new("warn"), captured.clone(), || {
            let mut config = AppConfig::default();
            config.apply_overrides(|key| match key {
                "NIAGA_DB_MAX_CONNECTIONS" => Some("lots".to_string()),
                _ => None,
            });
            config
        });

        assert_eq!(config.database.max_connections, 5);
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Ignoring non-numeric NIAGA_DB_MAX_CONNECTIONS"));
    }
}
