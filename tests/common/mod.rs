//! In-memory store for exercising the load path without a server.

#![allow(dead_code)]

use pt_export::store::{BulkStore, HostInfo};
use pt_export::utils::StoreError;
use pt_export::wire::{decode_stream, field_as_i64, Table, Tuple};
use std::io::Read;

/// Records every statement and COPY in the order the exporter issued them
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub trace_id: i32,
    pub registered: Vec<String>,
    /// Statements and `COPY <table>` markers, in order
    pub log: Vec<String>,
    pub copies: Vec<(Table, Vec<u8>)>,
    /// Reject any statement containing this text
    pub fail_statement: Option<String>,
    /// Reject the COPY into this table
    pub fail_copy: Option<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            trace_id: 1,
            ..Self::default()
        }
    }

    pub fn tuples(&self, table: Table) -> Vec<Tuple> {
        self.copies
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, bytes)| decode_stream(bytes).expect("valid COPY stream"))
            .unwrap_or_default()
    }

    pub fn copied_tables(&self) -> Vec<Table> {
        self.copies.iter().map(|(t, _)| *t).collect()
    }

    pub fn statements(&self) -> Vec<&str> {
        self.log
            .iter()
            .filter(|entry| !entry.starts_with("COPY "))
            .map(String::as_str)
            .collect()
    }
}

impl BulkStore for MemoryStore {
    fn register_trace(&mut self, name: &str, _host: &HostInfo) -> Result<i32, StoreError> {
        self.registered.push(name.to_string());
        Ok(self.trace_id)
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        if let Some(pattern) = &self.fail_statement {
            if sql.contains(pattern.as_str()) {
                return Err(StoreError::Rejected(sql.to_string()));
            }
        }
        self.log.push(sql.to_string());
        Ok(())
    }

    fn copy_in(&mut self, table: Table, data: &mut dyn Read) -> Result<u64, StoreError> {
        if self.fail_copy == Some(table) {
            return Err(StoreError::Rejected(format!("COPY {}", table)));
        }
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)
            .map_err(|source| StoreError::CopySource {
                table: table.name(),
                source,
            })?;
        let rows = decode_stream(&bytes)
            .map_err(|e| StoreError::Rejected(e.to_string()))?
            .len() as u64;

        self.log.push(format!("COPY {}", table));
        self.copies.push((table, bytes));
        Ok(rows)
    }
}

/// Integer value of a non-null field
pub fn int(field: &Option<Vec<u8>>) -> i64 {
    field
        .as_deref()
        .and_then(field_as_i64)
        .expect("non-null integer field")
}

pub fn text(field: &Option<Vec<u8>>) -> String {
    String::from_utf8(field.clone().expect("non-null text field")).expect("utf-8 field")
}

/// Entries left in a directory
pub fn dir_entries(path: &std::path::Path) -> usize {
    std::fs::read_dir(path).map(|d| d.count()).unwrap_or(0)
}
