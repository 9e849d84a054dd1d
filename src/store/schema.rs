//! Fixed DDL for a run.
//!
//! Table definitions are generated from the wire column catalogue, so the
//! tables always match the tuples the encoder writes. Keys are added only
//! after the data is loaded.

use crate::utils::config::SCHEMA_PREFIX;
use crate::wire::Table;

/// Registry of loaded traces, shared by every run
pub const REGISTRY_DDL: &str = "CREATE TABLE IF NOT EXISTS public.traces (\
     id serial PRIMARY KEY, \
     name text, \
     cpu_count integer, \
     device text, \
     created timestamptz, \
     build text)";

pub const REGISTER_TRACE_SQL: &str = "INSERT INTO public.traces (name, cpu_count, device, created, build) \
     VALUES ($1, $2, $3, now(), $4) RETURNING id";

pub fn schema_name(trace_id: i32) -> String {
    format!("{}{}", SCHEMA_PREFIX, trace_id)
}

/// Statements that create the run's schema and make it current
pub fn schema_setup(schema: &str) -> Vec<String> {
    vec![
        format!("CREATE SCHEMA {}", schema),
        format!("SET search_path TO {}", schema),
        "SET client_min_messages TO WARNING".to_string(),
    ]
}

pub fn create_table(table: Table) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .map(|c| {
            if c.not_null {
                format!("{} {} NOT NULL", c.name, c.ty.sql())
            } else {
                format!("{} {}", c.name, c.ty.sql())
            }
        })
        .collect();
    format!("CREATE TABLE {} ({})", table.name(), columns.join(", "))
}

fn primary_key_column(table: Table) -> &'static str {
    match table {
        Table::Threads => "tid",
        _ => "id",
    }
}

pub fn primary_keys(tables: &[Table]) -> Vec<String> {
    tables
        .iter()
        .map(|&t| {
            format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                t.name(),
                primary_key_column(t)
            )
        })
        .collect()
}

struct ForeignKey {
    table: Table,
    name: &'static str,
    column: &'static str,
    references: Table,
}

// Dependency order: a table's keys come after those of the tables it
// references.
const FOREIGN_KEYS: &[ForeignKey] = &[
    ForeignKey { table: Table::Symbols, name: "dsofk", column: "dso_id", references: Table::Dsos },
    ForeignKey { table: Table::Instructions, name: "symfk", column: "symbol_id", references: Table::Symbols },
    ForeignKey { table: Table::Samples, name: "threadfk", column: "thread_id", references: Table::Threads },
    ForeignKey { table: Table::Samples, name: "instrfk", column: "instruction_id", references: Table::Instructions },
    ForeignKey { table: Table::DsoJumps, name: "instrjumpfromfk", column: "from_instruction_id", references: Table::Instructions },
    ForeignKey { table: Table::DsoJumps, name: "instrjumptofk", column: "to_instruction_id", references: Table::Instructions },
    ForeignKey { table: Table::CallPaths, name: "parentfk", column: "parent_id", references: Table::CallPaths },
    ForeignKey { table: Table::CallPaths, name: "symbolfk", column: "symbol_id", references: Table::Symbols },
    ForeignKey { table: Table::Calls, name: "call_pathfk", column: "call_path_id", references: Table::CallPaths },
    ForeignKey { table: Table::Calls, name: "callfk", column: "call_id", references: Table::Samples },
    ForeignKey { table: Table::Calls, name: "returnfk", column: "return_id", references: Table::Samples },
    ForeignKey { table: Table::Calls, name: "parent_call_pathfk", column: "parent_call_path_id", references: Table::CallPaths },
];

/// One `ALTER TABLE` per referencing table, skipping constraints whose
/// tables are not part of the run
pub fn foreign_keys(tables: &[Table]) -> Vec<String> {
    let mut statements: Vec<(Table, Vec<String>)> = Vec::new();

    for fk in FOREIGN_KEYS {
        if !tables.contains(&fk.table) || !tables.contains(&fk.references) {
            continue;
        }
        let clause = format!(
            "ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            fk.name,
            fk.column,
            fk.references.name(),
            primary_key_column(fk.references)
        );
        match statements.last_mut() {
            Some((table, clauses)) if *table == fk.table => clauses.push(clause),
            _ => statements.push((fk.table, vec![clause])),
        }
    }

    statements
        .into_iter()
        .map(|(table, clauses)| format!("ALTER TABLE {} {}", table.name(), clauses.join(", ")))
        .collect()
}

pub fn indexes(tables: &[Table]) -> Vec<String> {
    if tables.contains(&Table::Calls) {
        vec!["CREATE INDEX pcpid_idx ON calls (parent_call_path_id)".to_string()]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_threads_table() {
        assert_eq!(
            create_table(Table::Threads),
            "CREATE TABLE threads (tid integer NOT NULL, pid integer)"
        );
    }

    #[test]
    fn test_create_dsos_table() {
        assert_eq!(
            create_table(Table::Dsos),
            "CREATE TABLE dsos (id smallint NOT NULL, name varchar(256))"
        );
    }

    #[test]
    fn test_threads_key_on_tid() {
        assert_eq!(
            primary_keys(&[Table::Threads, Table::Dsos]),
            vec![
                "ALTER TABLE threads ADD PRIMARY KEY (tid)".to_string(),
                "ALTER TABLE dsos ADD PRIMARY KEY (id)".to_string(),
            ]
        );
    }

    #[test]
    fn test_foreign_keys_grouped_per_table() {
        let tables = [
            Table::Threads,
            Table::Dsos,
            Table::Instructions,
            Table::Symbols,
            Table::Samples,
            Table::DsoJumps,
        ];
        let fks = foreign_keys(&tables);
        assert_eq!(fks.len(), 4);
        assert_eq!(
            fks[2],
            "ALTER TABLE samples \
             ADD CONSTRAINT threadfk FOREIGN KEY (thread_id) REFERENCES threads (tid), \
             ADD CONSTRAINT instrfk FOREIGN KEY (instruction_id) REFERENCES instructions (id)"
        );
        assert!(fks.iter().all(|s| !s.contains("call_paths")));
        assert!(indexes(&tables).is_empty());
    }

    #[test]
    fn test_call_tables_add_keys_and_index() {
        let fks = foreign_keys(&Table::ALL);
        assert_eq!(fks.len(), 6);
        assert!(fks[5].starts_with("ALTER TABLE calls ADD CONSTRAINT call_pathfk"));
        assert_eq!(indexes(&Table::ALL).len(), 1);
    }

    #[test]
    fn test_schema_name() {
        assert_eq!(schema_name(12), "pt12");
        assert_eq!(schema_setup("pt12")[1], "SET search_path TO pt12");
    }
}
