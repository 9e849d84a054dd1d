//! Streaming state kept across samples.
//!
//! This module turns the per-sample event stream into:
//! - Deduplicated instructions with execution counts
//! - DSO transition records
//! - Collapsed JIT module ids

pub mod collapse;
pub mod dso_jumps;
pub mod instructions;

// Re-export main types
pub use collapse::{is_jitted_dso_name, DsoCollapser};
pub use dso_jumps::DsoTransitionTracker;
pub use instructions::InstructionTable;
