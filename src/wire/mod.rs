//! Binary COPY wire format.
//!
//! This module handles:
//! - The typed row catalogue for every output table
//! - Encoding rows into COPY tuples
//! - Decoding COPY streams for validation

pub mod decoder;
pub mod encoder;
pub mod records;

// Re-export main types
pub use decoder::{decode_stream, field_as_i64, CopyReader, Tuple};
pub use encoder::{encode_record, fit_name, write_header, write_trailer};
pub use records::{
    CallPathRow, CallRow, Column, ColumnType, DsoJumpRow, DsoRow, InstructionRow, Record, SampleRow,
    SymbolRow, Table, ThreadRow,
};
