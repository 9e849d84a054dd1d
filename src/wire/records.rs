//! Typed rows for every output table.
//!
//! The column catalogue here is the single source of truth for table
//! shape: the encoder writes fields in `Table::columns()` order and the
//! DDL in `store::schema` is generated from the same list.

/// Output tables, in the order they are copied into the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Threads,
    Dsos,
    Instructions,
    Symbols,
    Samples,
    DsoJumps,
    CallPaths,
    Calls,
}

impl Table {
    /// Every table in copy order
    pub const ALL: [Table; 8] = [
        Table::Threads,
        Table::Dsos,
        Table::Instructions,
        Table::Symbols,
        Table::Samples,
        Table::DsoJumps,
        Table::CallPaths,
        Table::Calls,
    ];

    /// Table name in the target schema
    pub fn name(self) -> &'static str {
        match self {
            Table::Threads => "threads",
            Table::Dsos => "dsos",
            Table::Instructions => "instructions",
            Table::Symbols => "symbols",
            Table::Samples => "samples",
            Table::DsoJumps => "dso_jumps",
            Table::CallPaths => "call_paths",
            Table::Calls => "calls",
        }
    }

    /// File name of the staging buffer
    pub fn file_name(self) -> &'static str {
        match self {
            Table::Threads => "thread_table.bin",
            Table::Dsos => "dso_table.bin",
            Table::Instructions => "instr_table.bin",
            Table::Symbols => "symbol_table.bin",
            Table::Samples => "sample_table.bin",
            Table::DsoJumps => "dso_jump_table.bin",
            Table::CallPaths => "call_path_table.bin",
            Table::Calls => "call_table.bin",
        }
    }

    pub fn columns(self) -> &'static [Column] {
        match self {
            Table::Threads => THREAD_COLUMNS,
            Table::Dsos => DSO_COLUMNS,
            Table::Instructions => INSTRUCTION_COLUMNS,
            Table::Symbols => SYMBOL_COLUMNS,
            Table::Samples => SAMPLE_COLUMNS,
            Table::DsoJumps => DSO_JUMP_COLUMNS,
            Table::CallPaths => CALL_PATH_COLUMNS,
            Table::Calls => CALL_COLUMNS,
        }
    }

    /// Number of fields in every tuple of this table
    pub fn field_count(self) -> i16 {
        self.columns().len() as i16
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// PostgreSQL column types used by the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    VarChar(u16),
    ByteA,
}

impl ColumnType {
    pub fn sql(self) -> String {
        match self {
            ColumnType::SmallInt => "smallint".to_string(),
            ColumnType::Integer => "integer".to_string(),
            ColumnType::BigInt => "bigint".to_string(),
            ColumnType::VarChar(width) => format!("varchar({})", width),
            ColumnType::ByteA => "bytea".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub not_null: bool,
}

const fn key(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty, not_null: true }
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty, not_null: false }
}

use ColumnType::{BigInt, ByteA, Integer, SmallInt, VarChar};

const THREAD_COLUMNS: &[Column] = &[key("tid", Integer), col("pid", Integer)];

const DSO_COLUMNS: &[Column] = &[key("id", SmallInt), col("name", VarChar(256))];

const INSTRUCTION_COLUMNS: &[Column] = &[
    key("id", Integer),
    col("symbol_id", Integer),
    col("ip", BigInt),
    col("exec_count", Integer),
    col("sym_offset", BigInt),
    col("opcode", ByteA),
];

const SYMBOL_COLUMNS: &[Column] = &[
    key("id", Integer),
    col("dso_id", SmallInt),
    col("name", VarChar(256)),
    col("sym_start", BigInt),
    col("sym_end", BigInt),
];

const SAMPLE_COLUMNS: &[Column] = &[
    key("id", Integer),
    col("cpu_id", SmallInt),
    col("time", BigInt),
    col("instruction_id", Integer),
    col("thread_id", Integer),
];

const DSO_JUMP_COLUMNS: &[Column] = &[
    key("id", Integer),
    col("from_time", BigInt),
    col("from_instruction_id", Integer),
    col("to_time", BigInt),
    col("to_instruction_id", Integer),
];

const CALL_PATH_COLUMNS: &[Column] = &[
    key("id", Integer),
    col("parent_id", Integer),
    col("symbol_id", Integer),
    col("ip", BigInt),
];

const CALL_COLUMNS: &[Column] = &[
    key("id", Integer),
    col("call_path_id", Integer),
    col("call_time", BigInt),
    col("return_time", BigInt),
    col("branch_count", Integer),
    col("call_id", Integer),
    col("return_id", Integer),
    col("parent_call_path_id", Integer),
    col("flags", Integer),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRow {
    pub tid: i32,
    pub pid: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsoRow {
    pub id: i16,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRow {
    pub id: i32,
    pub dso_id: i16,
    pub name: String,
    pub sym_start: u64,
    pub sym_end: u64,
}

/// One distinct instruction pointer.
///
/// `symbol_id`, `sym_offset` and `opcode` are `None` when the pointer was
/// resolved but never annotated; `exec_count` is then -1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRow {
    pub id: i32,
    pub symbol_id: Option<i32>,
    pub ip: u64,
    pub exec_count: i32,
    pub sym_offset: Option<i64>,
    pub opcode: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRow {
    pub id: i32,
    pub cpu: i16,
    pub time: i64,
    pub instruction_id: i32,
    pub thread_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsoJumpRow {
    pub id: i32,
    pub from_time: i64,
    pub from_instruction_id: i32,
    pub to_time: i64,
    pub to_instruction_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPathRow {
    pub id: i32,
    pub parent_id: i32,
    pub symbol_id: i32,
    pub ip: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRow {
    pub id: i32,
    pub call_path_id: i32,
    pub call_time: i64,
    pub return_time: i64,
    pub branch_count: i32,
    pub call_id: i32,
    pub return_id: i32,
    pub parent_call_path_id: i32,
    pub flags: i32,
}

/// A row bound for exactly one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Thread(ThreadRow),
    Dso(DsoRow),
    Instruction(InstructionRow),
    Symbol(SymbolRow),
    Sample(SampleRow),
    DsoJump(DsoJumpRow),
    CallPath(CallPathRow),
    Call(CallRow),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::Thread(_) => Table::Threads,
            Record::Dso(_) => Table::Dsos,
            Record::Instruction(_) => Table::Instructions,
            Record::Symbol(_) => Table::Symbols,
            Record::Sample(_) => Table::Samples,
            Record::DsoJump(_) => Table::DsoJumps,
            Record::CallPath(_) => Table::CallPaths,
            Record::Call(_) => Table::Calls,
        }
    }
}
