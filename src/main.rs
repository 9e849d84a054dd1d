//! pt-export CLI
//!
//! Loads decoded processor-trace events into PostgreSQL through
//! binary COPY.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use pt_export::commands::{
    display_schema, display_version, execute_export, validate_args, validate_staged_file,
    ExportArgs,
};
use pt_export::export::{ColumnSet, ExportConfig};
use pt_export::utils::config::DEFAULT_DATABASE_URL;

/// pt-export - bulk-load processor traces into PostgreSQL
#[derive(Parser, Debug)]
#[command(name = "pt-export")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Export a decoded event stream into a new trace schema
    Export {
        /// Newline-delimited JSON events (`-` for stdin)
        input: PathBuf,

        /// Dataset name recorded in the trace registry
        #[arg(short, long)]
        dataset: String,

        /// PostgreSQL connection URL
        #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,

        /// Directory that holds the staging files during the run
        #[arg(long, default_value = ".")]
        staging_dir: PathBuf,

        /// Collapse jitted-*.so modules into hhvm-jitted.so / hhvm-pcre.so
        #[arg(long)]
        collapse_jit: bool,

        /// Sample columns delivered by the decoder
        #[arg(long, value_enum, default_value_t = ColumnSet::All)]
        columns: ColumnSet,

        /// Export call/return records (implies call paths)
        #[arg(long)]
        calls: bool,

        /// Export call paths for sample call chains
        #[arg(long)]
        callchains: bool,

        /// Write the run summary as JSON
        #[arg(long)]
        summary_json: Option<PathBuf>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate a staged binary COPY file
    Validate {
        /// Path to the COPY file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display the tables an export creates
    Schema {
        /// Print the full DDL
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Export {
            input,
            dataset,
            database_url,
            staging_dir,
            collapse_jit,
            columns,
            calls,
            callchains,
            summary_json,
            summary,
        } => {
            let args = ExportArgs {
                input,
                config: ExportConfig {
                    dataset,
                    collapse_jit_dsos: collapse_jit,
                    columns,
                    calls,
                    callchains,
                    database_url,
                    staging_root: staging_dir,
                },
                summary_json,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_export(args)?;
        }

        Commands::Validate { file } => {
            validate_staged_file(&file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
