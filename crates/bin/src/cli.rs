//! CLI argument definitions for the Scopestore binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;

use crate::output::OutputFormat;

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// In-memory with JSON persistence (default)
    Inmemory,
    /// SQLite database (requires the `sqlite` feature)
    Sqlite,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Human => OutputFormat::Human,
            Format::Json => OutputFormat::Json,
        }
    }
}

/// Scopestore: scoped views over a key-value store
#[derive(Parser, Debug)]
#[command(name = "scopestore")]
#[command(about = "Read and write one scope of a Scopestore container")]
#[command(version)]
pub struct Cli {
    /// Storage backend to use
    #[arg(short, long, default_value = "inmemory", env = "SCOPESTORE_BACKEND", global = true)]
    pub backend: Backend,

    /// Data directory for storage files.
    /// For InMemory: stores scopestore.json
    /// For SQLite: stores scopestore.db
    #[arg(short = 'D', long, env = "SCOPESTORE_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Dotted path of the scope, e.g. `app.settings`
    #[arg(short, long, default_value = "app", env = "SCOPESTORE_PATH", global = true)]
    pub path: String,

    /// JSON value a missing scope is initialized with (also used by `clear`)
    #[arg(
        long,
        default_value = "{}",
        env = "SCOPESTORE_DEFAULT",
        value_parser = parse_json,
        global = true
    )]
    pub default: Value,

    /// Number of change events buffered per subscriber
    #[arg(long, default_value_t = scopestore::constants::DEFAULT_CHANGE_CAPACITY, env = "SCOPESTORE_CHANGE_CAPACITY", global = true)]
    pub change_capacity: usize,

    /// Print the change events produced by the command as JSON lines
    #[arg(long, global = true)]
    pub events: bool,

    /// Output format
    #[arg(long, default_value = "human", global = true)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value stored under a key
    Get {
        key: String,
    },
    /// Store a value under a key. Values that are not valid JSON are stored as strings.
    Set {
        key: String,
        #[arg(value_parser = parse_value)]
        value: Value,
    },
    /// Remove a key
    Remove {
        key: String,
    },
    /// Reset the scope to its default value
    Clear,
    /// Check whether a key exists
    Has {
        key: String,
    },
    /// Print the whole scope
    All,
}

/// Parses a strict JSON argument.
fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

/// Parses a JSON argument, falling back to a plain string.
fn parse_value(raw: &str) -> Result<Value, String> {
    Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
}
