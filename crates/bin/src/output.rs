//! Output formatting helpers for human-readable and JSON output.

use scopestore::StorageChange;
use serde_json::Value;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Print a JSON value, pretty in human mode and compact in JSON mode.
pub fn print_value(value: &Value, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
    }
    Ok(())
}

/// Print a change event as one JSON line.
pub fn print_event(change: &StorageChange) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(change)?);
    Ok(())
}
