//! Staging directory holding one buffer per active table.
//!
//! The directory is a scoped resource: it is removed when the area (or
//! the `StagedTables` it turns into) is dropped, whichever way the run
//! ends.

use super::buffer::{StagedTable, StagingBuffer};
use crate::utils::error::StagingError;
use crate::wire::{Record, Table};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

pub struct StagingArea {
    dir: TempDir,
    buffers: BTreeMap<Table, StagingBuffer>,
}

impl StagingArea {
    /// Create `<root>/<name>`; fails if it already exists
    pub fn create(root: &Path, name: &str) -> Result<Self, StagingError> {
        validate_staging_root(root)?;

        if !root.exists() {
            debug!("Creating staging root: {}", root.display());
            std::fs::create_dir_all(root).map_err(|e| {
                StagingError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    root.display(),
                    e
                ))
            })?;
        }

        let dir = tempfile::Builder::new()
            .prefix(name)
            .rand_bytes(0)
            .tempdir_in(root)?;
        info!("Staging directory: {}", dir.path().display());

        Ok(Self {
            dir,
            buffers: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Open a buffer, with its signature block, for each table
    pub fn open_tables(&mut self, tables: &[Table]) -> Result<(), StagingError> {
        for &table in tables {
            if self.buffers.contains_key(&table) {
                continue;
            }
            let buffer = StagingBuffer::create(self.dir.path(), table)?;
            self.buffers.insert(table, buffer);
        }
        Ok(())
    }

    pub fn is_staged(&self, table: Table) -> bool {
        self.buffers.contains_key(&table)
    }

    pub fn append(&mut self, record: &Record) -> Result<(), StagingError> {
        let table = record.table();
        self.buffers
            .get_mut(&table)
            .ok_or(StagingError::TableNotStaged(table.name()))?
            .append(record)
    }

    pub fn rows(&self, table: Table) -> u64 {
        self.buffers.get(&table).map_or(0, StagingBuffer::rows)
    }

    /// Append trailers and close every buffer, in copy order
    pub fn finish(self) -> Result<StagedTables, StagingError> {
        let mut tables = Vec::with_capacity(self.buffers.len());
        for (_, buffer) in self.buffers {
            tables.push(buffer.finish()?);
        }
        Ok(StagedTables {
            dir: self.dir,
            tables,
        })
    }
}

/// Finished buffers waiting to be copied
pub struct StagedTables {
    dir: TempDir,
    tables: Vec<StagedTable>,
}

impl StagedTables {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Staged tables in copy order
    pub fn tables(&self) -> &[StagedTable] {
        &self.tables
    }

    /// Delete every buffer and the directory, reporting failures
    pub fn remove(self) -> Result<(), StagingError> {
        for staged in &self.tables {
            debug!("Removing {}", staged.path.display());
            std::fs::remove_file(&staged.path)?;
        }
        self.dir.close()?;
        Ok(())
    }
}

/// Validate that the staging root is usable
///
/// **Private** - internal validation
fn validate_staging_root(root: &Path) -> Result<(), StagingError> {
    if root.as_os_str().is_empty() {
        return Err(StagingError::InvalidPath("Path is empty".to_string()));
    }

    if root.exists() && !root.is_dir() {
        return Err(StagingError::InvalidPath(format!(
            "Path is not a directory: {}",
            root.display()
        )));
    }

    Ok(())
}
