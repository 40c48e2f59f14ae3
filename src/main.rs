use clap::Parser;
use hourledger::application::engine::LedgerEngine;
use hourledger::config::LedgerConfig;
use hourledger::domain::ports::{Clock, LedgerStoreBox};
use hourledger::infrastructure::clock::{ManualClock, SystemClock};
use hourledger::infrastructure::in_memory::{InMemoryLedgerStore, InMemoryTokenService};
use hourledger::interfaces::csv::command_reader::CommandReader;
use hourledger::interfaces::csv::state_writer::StateWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Ledger configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = hourledger::infrastructure::rocksdb::RocksDBStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Box::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => LedgerConfig::from_file(path).into_diagnostic()?,
        None => LedgerConfig::default(),
    };
    let store = open_store(cli.db_path)?;
    let tokens = InMemoryTokenService::new();
    // Replays run on the clock the command stream dictates.
    let clock = ManualClock::new(SystemClock.now());
    let engine = LedgerEngine::new(store, Box::new(tokens.clone()), Box::new(clock.clone()), config);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (row, result) in reader.commands().enumerate() {
        match result {
            Ok(scheduled) => {
                if let Some(at) = scheduled.at {
                    clock.set(at);
                }
                if let Err(e) = engine.execute(scheduled.command).await {
                    warn!(row = row + 1, error = %e, "Error processing command");
                }
            }
            Err(e) => {
                warn!(row = row + 1, error = %e, "Error reading command");
            }
        }
    }

    let snapshot = engine.snapshot().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = StateWriter::new(stdout.lock());
    writer
        .write_state(&snapshot.projects, &snapshot.members, &tokens.sent().await)
        .into_diagnostic()?;

    Ok(())
}
