//! Single-pass export of a decoded trace.
//!
//! An `Exporter` is created once per run, receives every decoder event in
//! trace order through [`Exporter::handle`], and is consumed by
//! [`Exporter::finish`], which drives the load. Dropping an exporter
//! before `finish` abandons the run and removes its staging directory.

use super::commit::{add_keys, copy_tables, prepare_schema, TableLoad};
use super::config::{ColumnSet, ExportConfig};
use crate::aggregator::{DsoCollapser, DsoTransitionTracker, InstructionTable};
use crate::events::{
    CallPathEvent, CallReturnEvent, DsoEvent, SampleEvent, SymbolEvent, ThreadEvent, TraceEvent,
};
use crate::staging::StagingArea;
use crate::store::schema::schema_name;
use crate::store::{BulkStore, HostInfo};
use crate::utils::config::UNKNOWN_NAME;
use crate::utils::error::{ExportError, ParseError};
use crate::wire::{
    CallPathRow, CallRow, DsoRow, Record, SampleRow, SymbolRow, Table, ThreadRow,
};
use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub trace_id: i32,
    pub schema: String,
    pub dataset: String,
    pub columns: ColumnSet,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub events: u64,
    pub tables: Vec<TableLoad>,
    pub unhandled_events: u64,
    pub truncated_names: u64,
}

impl RunSummary {
    /// Rows loaded into `table`, if it was part of the run
    pub fn rows(&self, table: Table) -> Option<u64> {
        self.tables
            .iter()
            .find(|load| load.table == table.name())
            .map(|load| load.rows)
    }
}

pub struct Exporter<'a, S: BulkStore + ?Sized> {
    config: ExportConfig,
    store: &'a mut S,
    trace_id: i32,
    schema: String,
    tables: Vec<Table>,
    staging: StagingArea,
    instructions: InstructionTable,
    collapser: DsoCollapser,
    transitions: DsoTransitionTracker,
    /// Thread ids already written; tid is the threads key
    threads: HashSet<i32>,
    events: u64,
    unhandled: u64,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl<'a, S: BulkStore + ?Sized> Exporter<'a, S> {
    /// Register the run, create its schema and staging buffers, and write
    /// the reserved rows
    pub fn begin(config: ExportConfig, store: &'a mut S) -> Result<Self, ExportError> {
        config.validate_config()?;
        let started_at = Utc::now();
        let started = Instant::now();

        info!("Step 1/5: Registering trace '{}'...", config.dataset);
        let host = HostInfo::detect();
        let trace_id = store.register_trace(&config.dataset, &host)?;
        let schema = schema_name(trace_id);
        info!("Trace id {} (schema {})", trace_id, schema);
        debug!(
            "Columns: {:?}, calls: {}, callchains: {}, collapse JIT DSOs: {}",
            config.columns, config.calls, config.callchains, config.collapse_jit_dsos
        );

        let mut staging = StagingArea::create(
            &config.staging_root,
            &ExportConfig::staging_dir_name(&schema),
        )?;

        let tables = config.active_tables();
        prepare_schema(store, &schema, &tables)?;
        staging.open_tables(&tables)?;

        let mut exporter = Self {
            collapser: DsoCollapser::new(config.collapse_jit_dsos),
            config,
            store,
            trace_id,
            schema,
            tables,
            staging,
            instructions: InstructionTable::new(),
            transitions: DsoTransitionTracker::new(),
            threads: HashSet::new(),
            events: 0,
            unhandled: 0,
            started_at,
            started,
        };
        exporter.write_reserved_rows()?;

        info!("Step 2/5: Ingesting events...");
        Ok(exporter)
    }

    pub fn trace_id(&self) -> i32 {
        self.trace_id
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Rows for the id-0 entities every other table may point at
    fn write_reserved_rows(&mut self) -> Result<(), ExportError> {
        self.threads.insert(0);
        self.staging
            .append(&Record::Thread(ThreadRow { tid: 0, pid: 0 }))?;
        self.staging.append(&Record::Dso(DsoRow {
            id: 0,
            name: UNKNOWN_NAME.to_string(),
        }))?;
        self.staging.append(&Record::Symbol(SymbolRow {
            id: 0,
            dso_id: 0,
            name: UNKNOWN_NAME.to_string(),
            sym_start: 0,
            sym_end: 0,
        }))?;
        if self.staging.is_staged(Table::CallPaths) {
            self.staging.append(&Record::CallPath(CallPathRow {
                id: 0,
                parent_id: 0,
                symbol_id: 0,
                ip: 0,
            }))?;
        }
        Ok(())
    }

    /// Apply one decoder event
    pub fn handle(&mut self, event: TraceEvent) -> Result<(), ExportError> {
        self.events += 1;
        match event {
            TraceEvent::Thread(e) => self.on_thread(e),
            TraceEvent::Dso(e) => self.on_dso(e),
            TraceEvent::Symbol(e) => self.on_symbol(e),
            TraceEvent::Sample(e) => self.on_sample(e),
            TraceEvent::CallPath(e) => self.on_call_path(e),
            TraceEvent::CallReturn(e) => self.on_call_return(e),
            TraceEvent::Evsel {}
            | TraceEvent::Machine {}
            | TraceEvent::Comm {}
            | TraceEvent::CommThread {}
            | TraceEvent::BranchType {}
            | TraceEvent::SchedSwitch {} => Ok(()),
            TraceEvent::Unhandled => {
                self.unhandled += 1;
                Ok(())
            }
        }
    }

    fn on_thread(&mut self, e: ThreadEvent) -> Result<(), ExportError> {
        if !self.threads.insert(e.tid) {
            debug!("Thread {} already written, skipping", e.tid);
            return Ok(());
        }
        self.staging
            .append(&Record::Thread(ThreadRow { tid: e.tid, pid: e.pid }))?;
        Ok(())
    }

    fn on_dso(&mut self, e: DsoEvent) -> Result<(), ExportError> {
        if let Some(row) = self.collapser.dso_row(e.dso_id, &e.short_name) {
            self.staging.append(&Record::Dso(row))?;
        }
        Ok(())
    }

    fn on_symbol(&mut self, e: SymbolEvent) -> Result<(), ExportError> {
        let dso_id = self.collapser.symbol_dso(e.dso_id, &e.symbol_name);
        self.staging.append(&Record::Symbol(SymbolRow {
            id: e.symbol_id,
            dso_id,
            name: e.symbol_name,
            sym_start: e.sym_start,
            sym_end: e.sym_end,
        }))?;
        Ok(())
    }

    fn on_sample(&mut self, e: SampleEvent) -> Result<(), ExportError> {
        let instruction_id = self.instructions.resolve(e.ip);
        self.instructions
            .record(e.ip, e.symbol_id, &e.insn, e.sym_offset);

        if let Some(jump) =
            self.transitions
                .observe(e.time, instruction_id, e.dso_id, &self.collapser)
        {
            trace!(
                "DSO jump {}: instruction {} -> {}",
                jump.id,
                jump.from_instruction_id,
                jump.to_instruction_id
            );
        }

        self.staging.append(&Record::Sample(SampleRow {
            id: e.sample_id,
            cpu: e.cpu,
            time: e.time,
            instruction_id,
            thread_id: e.tid,
        }))?;
        Ok(())
    }

    fn on_call_path(&mut self, e: CallPathEvent) -> Result<(), ExportError> {
        if !self.staging.is_staged(Table::CallPaths) {
            return Ok(());
        }
        self.staging.append(&Record::CallPath(CallPathRow {
            id: e.cp_id,
            parent_id: e.parent_id,
            symbol_id: e.symbol_id,
            ip: e.ip,
        }))?;
        Ok(())
    }

    fn on_call_return(&mut self, e: CallReturnEvent) -> Result<(), ExportError> {
        if !self.staging.is_staged(Table::Calls) || e.return_id == 0 {
            return Ok(());
        }
        self.staging.append(&Record::Call(CallRow {
            id: e.cr_id,
            call_path_id: e.call_path_id,
            call_time: e.call_time,
            return_time: e.return_time,
            branch_count: e.branch_count,
            call_id: e.call_id,
            return_id: e.return_id,
            parent_call_path_id: e.parent_call_path_id,
            flags: e.flags,
        }))?;
        Ok(())
    }

    /// Encode the aggregate tables, load everything and add keys
    pub fn finish(self) -> Result<RunSummary, ExportError> {
        let Self {
            config,
            store,
            trace_id,
            schema,
            tables,
            mut staging,
            instructions,
            transitions,
            events,
            unhandled,
            started_at,
            started,
            ..
        } = self;

        info!(
            "Step 3/5: Writing {} instructions and {} DSO jumps...",
            instructions.len(),
            transitions.len()
        );
        for row in instructions.into_rows() {
            staging.append(&Record::Instruction(row))?;
        }
        for row in transitions.into_rows() {
            staging.append(&Record::DsoJump(row))?;
        }

        let staged = staging.finish()?;
        let truncated_names: u64 = staged.tables().iter().map(|t| t.truncated).sum();

        info!("Step 4/5: Copying {} tables...", staged.tables().len());
        let loads = copy_tables(store, &staged)?;
        staged.remove()?;

        info!("Step 5/5: Adding keys and indexes...");
        add_keys(store, &tables)?;

        if unhandled > 0 {
            warn!("{} unhandled events", unhandled);
        }
        if truncated_names > 0 {
            warn!("{} names truncated", truncated_names);
        }

        let elapsed = started.elapsed();
        info!("Export completed in {:.2}s", elapsed.as_secs_f64());

        Ok(RunSummary {
            trace_id,
            schema,
            dataset: config.dataset,
            columns: config.columns,
            started_at,
            elapsed_secs: elapsed.as_secs_f64(),
            events,
            tables: loads,
            unhandled_events: unhandled,
            truncated_names,
        })
    }
}

/// Run a whole export from an event iterator
///
/// **Public** - the `export` command and integration tests drive runs
/// through this
pub fn export_events<S, I>(
    config: ExportConfig,
    store: &mut S,
    events: I,
) -> Result<RunSummary, ExportError>
where
    S: BulkStore + ?Sized,
    I: IntoIterator<Item = Result<TraceEvent, ParseError>>,
{
    let mut exporter = Exporter::begin(config, store)?;
    for event in events {
        exporter.handle(event?)?;
    }
    exporter.finish()
}
