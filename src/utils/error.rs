//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while reading decoder events
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read event stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed event on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur while decoding a binary COPY stream
#[derive(Error, Debug)]
pub enum WireError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing PGCOPY signature")]
    BadSignature,

    #[error("Unsupported header: flags {flags:#x}, extension length {extension}")]
    UnsupportedHeader { flags: i32, extension: i32 },

    #[error("Stream ended inside {0}")]
    Truncated(&'static str),

    #[error("Invalid field length {0}")]
    InvalidFieldLength(i32),

    #[error("Data after trailer")]
    TrailingBytes,
}

/// Errors that can occur while writing staging buffers
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Failed to write staging file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Invalid staging path: {0}")]
    InvalidPath(String),

    #[error("No staging buffer open for table {0}")]
    TableNotStaged(&'static str),
}

/// Errors that can occur while talking to the bulk-load target
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database connection failed: {0}")]
    ConnectFailed(#[source] sqlx::Error),

    #[error("Failed to start database runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("Statement failed ({sql}): {source}")]
    StatementFailed {
        sql: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("COPY into {table} failed: {source}")]
    CopyFailed {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to read staged data for {table}: {source}")]
    CopySource {
        table: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Store rejected request: {0}")]
    Rejected(String),
}

/// Errors that abort an export run
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Invalid export configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
