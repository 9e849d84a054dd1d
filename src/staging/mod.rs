//! On-disk staging of COPY streams.
//!
//! Every output table gets one buffer inside a run-scoped directory.
//! Buffers are written during the ingest pass and read back only after
//! they are finished.

pub mod area;
pub mod buffer;

// Re-export main types
pub use area::{StagedTables, StagingArea};
pub use buffer::{StagedTable, StagingBuffer};
