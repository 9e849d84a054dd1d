//! Bulk-load target.
//!
//! The commit driver talks to the database only through [`BulkStore`],
//! which keeps the load phases testable without a server.

pub mod postgres;
pub mod schema;

use crate::utils::error::StoreError;
use crate::wire::Table;
use std::io::Read;

pub use postgres::PgStore;

/// Operations the exporter needs from the target store
pub trait BulkStore {
    /// Add the run to the trace registry and return its id
    fn register_trace(&mut self, name: &str, host: &HostInfo) -> Result<i32, StoreError>;

    /// Run one statement to completion
    fn execute(&mut self, sql: &str) -> Result<(), StoreError>;

    /// Stream a complete binary COPY stream into `table`.
    ///
    /// Returns the number of rows the store accepted.
    fn copy_in(&mut self, table: Table, data: &mut dyn Read) -> Result<u64, StoreError>;
}

/// Facts about the capturing machine stored with each trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub cpu_count: i32,
    pub device: String,
    pub build: String,
}

impl HostInfo {
    /// Collect host facts; anything unreadable becomes `unknown`
    pub fn detect() -> Self {
        let hostname = read_proc("/proc/sys/kernel/hostname");
        let distro = std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|text| pretty_name(&text))
            .unwrap_or_else(|| "unknown".to_string());
        let version = read_proc("/proc/sys/kernel/version");
        let os_type = read_proc("/proc/sys/kernel/ostype");

        Self {
            cpu_count: num_cpus::get() as i32,
            device: format!("{}/{}", hostname, distro),
            build: format!("{}/{}", version, os_type),
        }
    }
}

fn read_proc(path: &str) -> String {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// `PRETTY_NAME` from an os-release file
fn pretty_name(os_release: &str) -> Option<String> {
    os_release.lines().find_map(|line| {
        line.strip_prefix("PRETTY_NAME=")
            .map(|value| value.trim_matches('"').to_string())
    })
}
