//! Run parameters for one export.

use crate::utils::config::{DEFAULT_DATABASE_URL, STAGING_DIR_SUFFIX};
use crate::utils::error::ExportError;
use crate::wire::Table;
use serde::Serialize;
use std::path::PathBuf;

/// Which sample columns the decoder was asked to deliver.
///
/// Table shapes are the same for both; the value is recorded with the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColumnSet {
    #[default]
    All,
    Branches,
}

/// Configuration for an export run
///
/// **Public** - built by the CLI, consumed by `Exporter::begin`
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Name stored in the trace registry
    pub dataset: String,

    /// Fold `jitted-*.so` modules into two pseudo-modules
    pub collapse_jit_dsos: bool,

    pub columns: ColumnSet,

    /// Load `calls` (implies `call_paths`)
    pub calls: bool,

    /// Load `call_paths` for sample call chains
    pub callchains: bool,

    pub database_url: String,

    /// Parent of the run's staging directory
    pub staging_root: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dataset: String::new(),
            collapse_jit_dsos: false,
            columns: ColumnSet::All,
            calls: false,
            callchains: false,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            staging_root: PathBuf::from("."),
        }
    }
}

impl ExportConfig {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    /// Tables loaded by this run, in copy order
    pub fn active_tables(&self) -> Vec<Table> {
        Table::ALL
            .into_iter()
            .filter(|table| match table {
                Table::CallPaths => self.calls || self.callchains,
                Table::Calls => self.calls,
                _ => true,
            })
            .collect()
    }

    /// Staging directory name for a registered run
    pub fn staging_dir_name(schema: &str) -> String {
        format!("{}{}", schema, STAGING_DIR_SUFFIX)
    }

    /// Check the configuration before anything is created
    pub fn validate_config(&self) -> Result<(), ExportError> {
        if self.dataset.trim().is_empty() {
            return Err(ExportError::InvalidConfig(
                "Dataset name cannot be empty".to_string(),
            ));
        }

        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(ExportError::InvalidConfig(
                "Database URL must start with postgres:// or postgresql://".to_string(),
            ));
        }

        if self.staging_root.as_os_str().is_empty() {
            return Err(ExportError::InvalidConfig(
                "Staging root cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
