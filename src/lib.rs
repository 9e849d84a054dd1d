//! pt-export
//!
//! Loads processor-trace samples decoded by `perf script` into
//! PostgreSQL. Events are deduplicated and staged as binary COPY
//! streams, then bulk-copied into a per-run schema.
//!
//! This crate provides the core implementation for the `pt-export`
//! CLI tool.
//!
//! ## Getting Started
//!
//! ```bash
//! perf script -s export-events.py | pt-export export --dataset run1 -
//! pt-export --help
//! ```

pub mod aggregator;
pub mod commands;
pub mod events;
pub mod export;
pub mod staging;
pub mod store;
pub mod utils;
pub mod wire;
