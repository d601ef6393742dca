//! FlatStore CLI
//!
//! Command-line interface over a FlatStore file.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use flatstore::{Config, FlatStore, SyncStrategy, Tracker};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// FlatStore CLI
#[derive(Parser, Debug)]
#[command(name = "flatstore")]
#[command(about = "Inspect and edit a single-file JSON key-value store")]
#[command(version)]
struct Args {
    /// Store file
    #[arg(short, long, default_value = "db/db.json")]
    path: String,

    /// fsync after this many writes (0 = leave it to the OS)
    #[arg(short, long, default_value = "1")]
    sync_every: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key to a JSON value (non-JSON input is stored as a string)
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Exists {
        /// The key to check
        key: String,
    },

    /// List all keys
    Keys,

    /// Print the whole store
    Dump,

    /// Record an open of a tracking id
    Open {
        /// The tracking id
        id: String,
    },

    /// Print every tracking record
    Report,
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,flatstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let sync_strategy = match args.sync_every {
        0 => SyncStrategy::OsManaged,
        1 => SyncStrategy::EveryWrite,
        n => SyncStrategy::EveryNWrites { count: n },
    };

    let config = Config::builder()
        .path(&args.path)
        .sync_strategy(sync_strategy)
        .build();

    let store = match FlatStore::open(config) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open store {}: {}", args.path, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = run(&store, args.command) {
        tracing::error!("{}", e);
        return ExitCode::FAILURE;
    }

    match Arc::try_unwrap(store) {
        Ok(store) => match store.close() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("Failed to close store: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(_) => ExitCode::SUCCESS,
    }
}

fn run(store: &Arc<FlatStore>, command: Commands) -> flatstore::Result<()> {
    match command {
        Commands::Get { key } => {
            let value: Value = store.get(&key)?;
            print_json(&value)?;
        }
        Commands::Set { key, value } => {
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            store.set(key, &value)?;
        }
        Commands::Del { key } => store.delete(&key)?,
        Commands::Exists { key } => println!("{}", store.try_exists(&key)?),
        Commands::Keys => {
            for key in store.try_keys()? {
                println!("{}", key);
            }
        }
        Commands::Dump => {
            let all: Value = store.get_all()?;
            print_json(&all)?;
        }
        Commands::Open { id } => {
            let record = Tracker::new(Arc::clone(store)).record_open(&id)?;
            print_json(&record)?;
        }
        Commands::Report => {
            let report = Tracker::new(Arc::clone(store)).report()?;
            print_json(&report)?;
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> flatstore::Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(flatstore::FlatError::Encode)?;
    println!("{}", text);
    Ok(())
}
