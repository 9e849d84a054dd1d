//! PostgreSQL binary COPY encoder.
//!
//! Stream layout:
//! ```text
//! signature (11 bytes) | flags i32 = 0 | extension length i32 = 0
//! per tuple: i16 field count, then per field i32 length + bytes (-1 = NULL)
//! trailer i16 = -1
//! ```
//! All integers are big-endian.

use super::records::{
    CallPathRow, CallRow, DsoJumpRow, DsoRow, InstructionRow, Record, SampleRow, SymbolRow, Table,
    ThreadRow,
};
use crate::utils::config::{COPY_SIGNATURE, COPY_TRAILER, MAX_NAME_LEN, NULL_FIELD_LENGTH};
use byteorder::{BigEndian, WriteBytesExt};
use log::warn;
use std::io::{self, Write};

/// Write the stream signature block
pub fn write_header<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(COPY_SIGNATURE)?;
    w.write_i32::<BigEndian>(0)?;
    w.write_i32::<BigEndian>(0)
}

/// Write the end-of-data sentinel
pub fn write_trailer<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_i16::<BigEndian>(COPY_TRAILER)
}

/// Encode one record as a COPY tuple.
///
/// Returns the number of fields that had to be truncated to fit their
/// column. Truncation is logged but never rejects the record.
pub fn encode_record<W: Write>(record: &Record, w: &mut W) -> io::Result<u32> {
    match record {
        Record::Thread(row) => encode_thread(row, w),
        Record::Dso(row) => encode_dso(row, w),
        Record::Instruction(row) => encode_instruction(row, w),
        Record::Symbol(row) => encode_symbol(row, w),
        Record::Sample(row) => encode_sample(row, w),
        Record::DsoJump(row) => encode_dso_jump(row, w),
        Record::CallPath(row) => encode_call_path(row, w),
        Record::Call(row) => encode_call(row, w),
    }
}

fn encode_thread<W: Write>(row: &ThreadRow, w: &mut W) -> io::Result<u32> {
    let mut t = TupleWriter::begin(Table::Threads, w)?;
    t.int4(row.tid)?;
    t.int4(row.pid)?;
    t.finish()
}

fn encode_dso<W: Write>(row: &DsoRow, w: &mut W) -> io::Result<u32> {
    let mut t = TupleWriter::begin(Table::Dsos, w)?;
    t.int2(row.id)?;
    t.name(&row.name, "DSO")?;
    t.finish()
}

fn encode_instruction<W: Write>(row: &InstructionRow, w: &mut W) -> io::Result<u32> {
    let mut t = TupleWriter::begin(Table::Instructions, w)?;
    t.int4(row.id)?;
    match row.symbol_id {
        Some(id) => t.int4(id)?,
        None => t.null()?,
    }
    t.address(row.ip)?;
    t.int4(row.exec_count)?;
    match row.sym_offset {
        Some(offset) => t.int8(offset)?,
        None => t.null()?,
    }
    match &row.opcode {
        Some(bytes) => t.bytes(bytes)?,
        None => t.null()?,
    }
    t.finish()
}

fn encode_symbol<W: Write>(row: &SymbolRow, w: &mut W) -> io::Result<u32> {
    let mut t = TupleWriter::begin(Table::Symbols, w)?;
    t.int4(row.id)?;
    t.int2(row.dso_id)?;
    t.name(&row.name, "Symbol")?;
    t.address(row.sym_start)?;
    t.address(row.sym_end)?;
    t.finish()
}

fn encode_sample<W: Write>(row: &SampleRow, w: &mut W) -> io::Result<u32> {
    let mut t = TupleWriter::begin(Table::Samples, w)?;
    t.int4(row.id)?;
    t.int2(row.cpu)?;
    t.int8(row.time)?;
    t.int4(row.instruction_id)?;
    t.int4(row.thread_id)?;
    t.finish()
}

fn encode_dso_jump<W: Write>(row: &DsoJumpRow, w: &mut W) -> io::Result<u32> {
    let mut t = TupleWriter::begin(Table::DsoJumps, w)?;
    t.int4(row.id)?;
    t.int8(row.from_time)?;
    t.int4(row.from_instruction_id)?;
    t.int8(row.to_time)?;
    t.int4(row.to_instruction_id)?;
    t.finish()
}

fn encode_call_path<W: Write>(row: &CallPathRow, w: &mut W) -> io::Result<u32> {
    let mut t = TupleWriter::begin(Table::CallPaths, w)?;
    t.int4(row.id)?;
    t.int4(row.parent_id)?;
    t.int4(row.symbol_id)?;
    t.address(row.ip)?;
    t.finish()
}

fn encode_call<W: Write>(row: &CallRow, w: &mut W) -> io::Result<u32> {
    let mut t = TupleWriter::begin(Table::Calls, w)?;
    t.int4(row.id)?;
    t.int4(row.call_path_id)?;
    t.int8(row.call_time)?;
    t.int8(row.return_time)?;
    t.int4(row.branch_count)?;
    t.int4(row.call_id)?;
    t.int4(row.return_id)?;
    t.int4(row.parent_call_path_id)?;
    t.int4(row.flags)?;
    t.finish()
}

/// Cut `name` to at most `MAX_NAME_LEN` characters.
///
/// Returns the stored text and whether anything was dropped.
pub fn fit_name(name: &str) -> (&str, bool) {
    match name.char_indices().nth(MAX_NAME_LEN) {
        Some((cut, _)) => (&name[..cut], true),
        None => (name, false),
    }
}

/// Writes the fields of one tuple and checks the count against the
/// table's column catalogue.
struct TupleWriter<'a, W: Write> {
    w: &'a mut W,
    table: Table,
    written: i16,
    truncated: u32,
}

impl<'a, W: Write> TupleWriter<'a, W> {
    fn begin(table: Table, w: &'a mut W) -> io::Result<Self> {
        w.write_i16::<BigEndian>(table.field_count())?;
        Ok(Self {
            w,
            table,
            written: 0,
            truncated: 0,
        })
    }

    fn int2(&mut self, v: i16) -> io::Result<()> {
        self.w.write_i32::<BigEndian>(2)?;
        self.w.write_i16::<BigEndian>(v)?;
        self.written += 1;
        Ok(())
    }

    fn int4(&mut self, v: i32) -> io::Result<()> {
        self.w.write_i32::<BigEndian>(4)?;
        self.w.write_i32::<BigEndian>(v)?;
        self.written += 1;
        Ok(())
    }

    fn int8(&mut self, v: i64) -> io::Result<()> {
        self.w.write_i32::<BigEndian>(8)?;
        self.w.write_i64::<BigEndian>(v)?;
        self.written += 1;
        Ok(())
    }

    /// Addresses keep their bit pattern in the signed bigint column
    fn address(&mut self, v: u64) -> io::Result<()> {
        self.int8(v as i64)
    }

    fn bytes(&mut self, v: &[u8]) -> io::Result<()> {
        let len = i32::try_from(v.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "field longer than 2 GiB"))?;
        self.w.write_i32::<BigEndian>(len)?;
        self.w.write_all(v)?;
        self.written += 1;
        Ok(())
    }

    fn name(&mut self, v: &str, what: &str) -> io::Result<()> {
        let (stored, cut) = fit_name(v);
        if cut {
            warn!(
                "{} name longer than max allowed by DB. Truncating to {} characters",
                what, MAX_NAME_LEN
            );
            self.truncated += 1;
        }
        self.bytes(stored.as_bytes())
    }

    fn null(&mut self) -> io::Result<()> {
        self.w.write_i32::<BigEndian>(NULL_FIELD_LENGTH)?;
        self.written += 1;
        Ok(())
    }

    fn finish(self) -> io::Result<u32> {
        debug_assert_eq!(
            self.written,
            self.table.field_count(),
            "field count mismatch for {}",
            self.table
        );
        Ok(self.truncated)
    }
}
