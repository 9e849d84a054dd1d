//! Load phases that talk to the store.
//!
//! Schema objects are created before ingest; data is copied table by
//! table once every buffer is complete; keys and indexes come last so the
//! COPYs run without constraint checks.

use crate::staging::StagedTables;
use crate::store::schema::{create_table, foreign_keys, indexes, primary_keys, schema_setup};
use crate::store::BulkStore;
use crate::utils::error::StoreError;
use crate::wire::Table;
use log::{debug, info, warn};
use serde::Serialize;
use std::io::BufReader;

/// Rows one table received
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLoad {
    pub table: String,
    pub rows: u64,
}

/// Create the run's schema and one empty table per active table
pub fn prepare_schema<S: BulkStore + ?Sized>(
    store: &mut S,
    schema: &str,
    tables: &[Table],
) -> Result<(), StoreError> {
    for statement in schema_setup(schema) {
        store.execute(&statement)?;
    }
    for &table in tables {
        debug!("Creating table {}", table);
        store.execute(&create_table(table))?;
    }
    Ok(())
}

/// Stream every staged buffer into its table, in copy order
pub fn copy_tables<S: BulkStore + ?Sized>(
    store: &mut S,
    staged: &StagedTables,
) -> Result<Vec<TableLoad>, StoreError> {
    let mut loads = Vec::with_capacity(staged.tables().len());

    for table in staged.tables() {
        let name = table.table.name();
        let file = table
            .open()
            .map_err(|source| StoreError::CopySource { table: name, source })?;

        let rows = store.copy_in(table.table, &mut BufReader::new(file))?;
        if rows != table.rows {
            warn!(
                "{}: staged {} rows but the store reported {}",
                name, table.rows, rows
            );
        }
        info!("Copied {} rows into {}", rows, name);

        loads.push(TableLoad {
            table: name.to_string(),
            rows,
        });
    }

    Ok(loads)
}

/// Primary keys, then foreign keys, then indexes
pub fn add_keys<S: BulkStore + ?Sized>(store: &mut S, tables: &[Table]) -> Result<(), StoreError> {
    for statement in primary_keys(tables)
        .into_iter()
        .chain(foreign_keys(tables))
        .chain(indexes(tables))
    {
        store.execute(&statement)?;
    }
    Ok(())
}
