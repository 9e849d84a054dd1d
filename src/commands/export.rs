//! Export command implementation.
//!
//! The export command:
//! 1. Opens the decoder event stream
//! 2. Connects to the database
//! 3. Runs the export pipeline over every event
//! 4. Writes the optional run summary

use crate::events::open_events;
use crate::export::{export_events, ExportConfig, RunSummary};
use crate::store::PgStore;
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Arguments for the export command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ExportArgs {
    /// Newline-delimited JSON events, `-` for stdin
    pub input: PathBuf,

    pub config: ExportConfig,

    /// Write the run summary as JSON here
    pub summary_json: Option<PathBuf>,

    /// Print a text summary to stdout
    pub print_summary: bool,
}

impl Default for ExportArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("-"),
            config: ExportConfig::default(),
            summary_json: None,
            print_summary: false,
        }
    }
}

/// Execute the export command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Unreadable or malformed event stream
/// * Database connection, statement or COPY failures
/// * Staging file errors
pub fn execute_export(args: ExportArgs) -> Result<RunSummary> {
    info!("Exporting '{}' from {}", args.config.dataset, args.input.display());

    let events = open_events(&args.input)
        .with_context(|| format!("Failed to open event stream {}", args.input.display()))?;

    let mut store =
        PgStore::connect(&args.config.database_url).context("Failed to connect to database")?;

    let summary = export_events(args.config, &mut store, events).context("Export failed")?;

    if let Err(e) = store.close() {
        warn!("Failed to close database connection: {}", e);
    }

    if let Some(path) = &args.summary_json {
        write_summary(&summary, path).context("Failed to write run summary")?;
        info!("✓ Summary written to: {}", path.display());
    }

    if args.print_summary {
        print_summary(&summary);
    }

    Ok(summary)
}

/// Validate export arguments
///
/// **Public** - can be called before execute_export for early validation
pub fn validate_args(args: &ExportArgs) -> Result<()> {
    if args.input.as_os_str() != "-" && !args.input.is_file() {
        anyhow::bail!("Event stream not found: {}", args.input.display());
    }

    args.config.validate_config()?;

    Ok(())
}

/// **Private** - JSON summary output
fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)?;
    Ok(())
}

/// **Private** - text summary output
fn print_summary(summary: &RunSummary) {
    println!("\n{}", "=".repeat(60));
    println!("EXPORT SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Dataset:  {}", summary.dataset);
    println!("Schema:   {}", summary.schema);
    println!("Started:  {}", summary.started_at.to_rfc3339());
    println!("Events:   {}", summary.events);
    for load in &summary.tables {
        println!("  {:<14} {:>12} rows", load.table, load.rows);
    }
    if summary.unhandled_events > 0 {
        println!("Unhandled events: {}", summary.unhandled_events);
    }
    if summary.truncated_names > 0 {
        println!("Truncated names:  {}", summary.truncated_names);
    }
    println!("Elapsed:  {:.2}s", summary.elapsed_secs);
    println!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args_stdin() {
        let args = ExportArgs {
            config: ExportConfig::new("perf"),
            ..Default::default()
        };

        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_missing_input() {
        let args = ExportArgs {
            input: PathBuf::from("/nonexistent/events.ndjson"),
            config: ExportConfig::new("perf"),
            ..Default::default()
        };

        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_empty_dataset() {
        let args = ExportArgs::default();

        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let args = ExportArgs {
            input: file.path().to_path_buf(),
            config: ExportConfig::new("perf"),
            ..Default::default()
        };

        assert!(validate_args(&args).is_ok());
    }
}
