//! PostgreSQL store over sqlx.
//!
//! The exporter is synchronous, so the store owns a current-thread tokio
//! runtime and blocks on every call. One connection is used for the whole
//! run; the `search_path` set during schema setup therefore also applies
//! to every COPY.

use super::schema::{REGISTER_TRACE_SQL, REGISTRY_DDL};
use super::{BulkStore, HostInfo};
use crate::utils::config::COPY_CHUNK_SIZE;
use crate::utils::error::StoreError;
use crate::wire::Table;
use log::{debug, info};
use sqlx::{Connection, Executor, PgConnection};
use std::io::{ErrorKind, Read};
use tokio::runtime::Runtime;

pub struct PgStore {
    runtime: Runtime,
    conn: PgConnection,
}

impl PgStore {
    /// Connect to `url`
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(StoreError::Runtime)?;

        let conn = runtime
            .block_on(PgConnection::connect(url))
            .map_err(StoreError::ConnectFailed)?;

        info!("Connected to database");

        Ok(Self { runtime, conn })
    }

    /// Terminate the connection cleanly
    pub fn close(self) -> Result<(), StoreError> {
        let Self { runtime, conn } = self;
        runtime
            .block_on(conn.close())
            .map_err(StoreError::ConnectFailed)
    }
}

impl BulkStore for PgStore {
    fn register_trace(&mut self, name: &str, host: &HostInfo) -> Result<i32, StoreError> {
        self.execute(REGISTRY_DDL)?;

        let query = sqlx::query_scalar::<_, i32>(REGISTER_TRACE_SQL)
            .bind(name)
            .bind(host.cpu_count)
            .bind(&host.device)
            .bind(&host.build);

        self.runtime
            .block_on(query.fetch_one(&mut self.conn))
            .map_err(|source| StoreError::StatementFailed {
                sql: REGISTER_TRACE_SQL.to_string(),
                source,
            })
    }

    fn execute(&mut self, sql: &str) -> Result<(), StoreError> {
        debug!("SQL: {}", sql);
        self.runtime
            .block_on(self.conn.execute(sql))
            .map(|_| ())
            .map_err(|source| StoreError::StatementFailed {
                sql: sql.to_string(),
                source,
            })
    }

    fn copy_in(&mut self, table: Table, data: &mut dyn Read) -> Result<u64, StoreError> {
        let sql = format!("COPY {} FROM STDIN (FORMAT 'binary')", table.name());
        let name = table.name();
        let copy_failed = |source| StoreError::CopyFailed { table: name, source };

        let conn = &mut self.conn;
        self.runtime.block_on(async move {
            let mut copy = conn.copy_in_raw(&sql).await.map_err(copy_failed)?;
            let mut chunk = vec![0u8; COPY_CHUNK_SIZE];

            loop {
                let n = match data.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(source) => {
                        // Leave the connection usable for the error report
                        let _ = copy.abort(source.to_string()).await;
                        return Err(StoreError::CopySource { table: name, source });
                    }
                };
                copy.send(&chunk[..n]).await.map_err(copy_failed)?;
            }

            let rows = copy.finish().await.map_err(copy_failed)?;
            debug!("COPY {} accepted {} rows", name, rows);
            Ok(rows)
        })
    }
}
