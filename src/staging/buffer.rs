//! Append-only COPY buffer for one table.
//!
//! The signature block is written when the buffer is created and the
//! trailer when it is finished, so a finished buffer is a complete
//! binary COPY stream ready to be sent as is.

use crate::utils::error::StagingError;
use crate::wire::{encode_record, write_header, write_trailer, Record, Table};
use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct StagingBuffer {
    table: Table,
    path: PathBuf,
    writer: BufWriter<File>,
    rows: u64,
    truncated: u64,
}

impl StagingBuffer {
    /// Create `<dir>/<table file name>` and write the signature block
    pub fn create(dir: &Path, table: Table) -> Result<Self, StagingError> {
        let path = dir.join(table.file_name());
        debug!("Opening staging buffer: {}", path.display());

        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        write_header(&mut writer)?;

        Ok(Self {
            table,
            path,
            writer,
            rows: 0,
            truncated: 0,
        })
    }

    /// Encode and append one record
    pub fn append(&mut self, record: &Record) -> Result<(), StagingError> {
        if record.table() != self.table {
            return Err(StagingError::TableNotStaged(record.table().name()));
        }
        self.truncated += u64::from(encode_record(record, &mut self.writer)?);
        self.rows += 1;
        Ok(())
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Fields shortened to fit their column so far
    pub fn truncated(&self) -> u64 {
        self.truncated
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the trailer and flush everything to disk
    pub fn finish(mut self) -> Result<StagedTable, StagingError> {
        write_trailer(&mut self.writer)?;
        self.writer.flush()?;
        let file = self
            .writer
            .into_inner()
            .map_err(|e| StagingError::WriteFailed(e.into_error()))?;
        let bytes = file.metadata()?.len();

        debug!(
            "Staged {} rows for {} ({} bytes)",
            self.rows, self.table, bytes
        );

        Ok(StagedTable {
            table: self.table,
            path: self.path,
            rows: self.rows,
            truncated: self.truncated,
            bytes,
        })
    }
}

/// A complete COPY stream on disk
#[derive(Debug, Clone)]
pub struct StagedTable {
    pub table: Table,
    pub path: PathBuf,
    pub rows: u64,
    pub truncated: u64,
    pub bytes: u64,
}

impl StagedTable {
    pub fn open(&self) -> std::io::Result<File> {
        File::open(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{decode_stream, field_as_i64, ThreadRow};

    #[test]
    fn test_finished_buffer_is_a_complete_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = StagingBuffer::create(dir.path(), Table::Threads).unwrap();
        buffer
            .append(&Record::Thread(ThreadRow { tid: 0, pid: 0 }))
            .unwrap();
        buffer
            .append(&Record::Thread(ThreadRow { tid: 9, pid: 8 }))
            .unwrap();

        let staged = buffer.finish().unwrap();
        assert_eq!(staged.rows, 2);
        assert_eq!(staged.path, dir.path().join("thread_table.bin"));

        let bytes = std::fs::read(&staged.path).unwrap();
        assert_eq!(staged.bytes, bytes.len() as u64);

        let tuples = decode_stream(&bytes).unwrap();
        assert_eq!(tuples.len(), 2);
        let tid = field_as_i64(tuples[1][0].as_deref().unwrap());
        assert_eq!(tid, Some(9));
    }

    #[test]
    fn test_wrong_table_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut buffer = StagingBuffer::create(dir.path(), Table::Dsos).unwrap();
        let result = buffer.append(&Record::Thread(ThreadRow { tid: 1, pid: 1 }));
        assert!(matches!(result, Err(StagingError::TableNotStaged("threads"))));
        assert_eq!(buffer.rows(), 0);
    }
}
