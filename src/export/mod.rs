//! Export pipeline.
//!
//! This module handles:
//! - Run parameters and the set of active tables
//! - Routing decoder events into staging buffers
//! - Driving the load into the store once the stream ends

pub mod commit;
pub mod config;
pub mod pipeline;

// Re-export main types
pub use commit::TableLoad;
pub use config::{ColumnSet, ExportConfig};
pub use pipeline::{export_events, Exporter, RunSummary};
