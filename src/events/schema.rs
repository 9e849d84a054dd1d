//! Decoder event definitions.
//!
//! One JSON object per event, tagged by `kind`. Field names follow the
//! decoder's export callbacks; fields the exporter does not store are
//! accepted and ignored.

use serde::{Deserialize, Serialize};

/// Every event kind the decoder can deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    Thread(ThreadEvent),
    Dso(DsoEvent),
    Symbol(SymbolEvent),
    Sample(SampleEvent),
    CallPath(CallPathEvent),
    CallReturn(CallReturnEvent),

    // Acknowledged, nothing is stored for these
    Evsel {},
    Machine {},
    Comm {},
    CommThread {},
    BranchType {},
    SchedSwitch {},

    /// Any kind not listed above
    #[serde(other)]
    Unhandled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadEvent {
    pub tid: i32,
    pub pid: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsoEvent {
    pub dso_id: i16,
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub build_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEvent {
    pub symbol_id: i32,
    pub dso_id: i16,
    pub sym_start: u64,
    pub sym_end: u64,
    #[serde(default)]
    pub binding: i32,
    pub symbol_name: String,
}

/// One captured sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEvent {
    pub sample_id: i32,
    pub tid: i32,
    pub dso_id: i16,
    pub symbol_id: i32,
    pub sym_offset: i64,
    pub ip: u64,
    pub time: i64,
    pub cpu: i16,
    /// Raw instruction bytes at `ip`
    #[serde(default)]
    pub insn: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPathEvent {
    pub cp_id: i32,
    pub parent_id: i32,
    pub symbol_id: i32,
    pub ip: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReturnEvent {
    pub cr_id: i32,
    pub call_path_id: i32,
    pub call_time: i64,
    pub return_time: i64,
    pub branch_count: i32,
    pub call_id: i32,
    /// 0 when the call never returned inside the trace
    pub return_id: i32,
    pub parent_call_path_id: i32,
    pub flags: i32,
}
