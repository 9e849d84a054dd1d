//! Decoder event stream.
//!
//! This module handles:
//! - Event type definitions, one per decoder callback
//! - Reading newline-delimited JSON events from a file or stdin

pub mod reader;
pub mod schema;

// Re-export main types
pub use reader::{open_events, parse_event, EventReader};
pub use schema::{
    CallPathEvent, CallReturnEvent, DsoEvent, SampleEvent, SymbolEvent, ThreadEvent, TraceEvent,
};
