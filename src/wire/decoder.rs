//! Reader for PostgreSQL binary COPY streams.
//!
//! Used to validate staged files and in tests; the load path never
//! decodes its own output.

use crate::utils::config::{COPY_SIGNATURE, COPY_TRAILER, NULL_FIELD_LENGTH};
use crate::utils::error::WireError;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{self, Read};

/// One decoded tuple; `None` is a NULL field
pub type Tuple = Vec<Option<Vec<u8>>>;

/// Streaming tuple reader
pub struct CopyReader<R: Read> {
    inner: R,
    done: bool,
}

impl<R: Read> CopyReader<R> {
    /// Consume the signature block and position at the first tuple
    pub fn new(mut inner: R) -> Result<Self, WireError> {
        let mut signature = [0u8; 11];
        inner
            .read_exact(&mut signature)
            .map_err(|e| eof_as(e, "signature"))?;
        if &signature != COPY_SIGNATURE {
            return Err(WireError::BadSignature);
        }

        let flags = inner
            .read_i32::<BigEndian>()
            .map_err(|e| eof_as(e, "header flags"))?;
        let extension = inner
            .read_i32::<BigEndian>()
            .map_err(|e| eof_as(e, "header extension"))?;
        if flags != 0 || extension < 0 {
            return Err(WireError::UnsupportedHeader { flags, extension });
        }

        // Extension area is reserved; skip whatever is there
        let mut skipped = vec![0u8; extension as usize];
        inner
            .read_exact(&mut skipped)
            .map_err(|e| eof_as(e, "header extension"))?;

        Ok(Self { inner, done: false })
    }

    /// Next tuple, or `None` once the trailer has been read
    pub fn next_tuple(&mut self) -> Result<Option<Tuple>, WireError> {
        if self.done {
            return Ok(None);
        }

        let count = self
            .inner
            .read_i16::<BigEndian>()
            .map_err(|e| eof_as(e, "tuple header"))?;
        if count == COPY_TRAILER {
            self.done = true;
            return Ok(None);
        }

        let mut fields = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            let len = self
                .inner
                .read_i32::<BigEndian>()
                .map_err(|e| eof_as(e, "field length"))?;
            if len == NULL_FIELD_LENGTH {
                fields.push(None);
                continue;
            }
            if len < 0 {
                return Err(WireError::InvalidFieldLength(len));
            }
            let mut value = vec![0u8; len as usize];
            self.inner
                .read_exact(&mut value)
                .map_err(|e| eof_as(e, "field data"))?;
            fields.push(Some(value));
        }

        Ok(Some(fields))
    }

    /// Fail if anything follows the trailer
    pub fn finish(mut self) -> Result<(), WireError> {
        while self.next_tuple()?.is_some() {}
        let mut rest = [0u8; 1];
        match self.inner.read(&mut rest)? {
            0 => Ok(()),
            _ => Err(WireError::TrailingBytes),
        }
    }
}

/// Decode a complete in-memory stream
pub fn decode_stream(bytes: &[u8]) -> Result<Vec<Tuple>, WireError> {
    let mut reader = CopyReader::new(bytes)?;
    let mut tuples = Vec::new();
    while let Some(tuple) = reader.next_tuple()? {
        tuples.push(tuple);
    }
    reader.finish()?;
    Ok(tuples)
}

/// Interpret a 2, 4 or 8 byte big-endian integer field
pub fn field_as_i64(field: &[u8]) -> Option<i64> {
    match field.len() {
        2 => Some(i16::from_be_bytes([field[0], field[1]]) as i64),
        4 => Some(i32::from_be_bytes([field[0], field[1], field[2], field[3]]) as i64),
        8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(field);
            Some(i64::from_be_bytes(raw))
        }
        _ => None,
    }
}

fn eof_as(e: io::Error, what: &'static str) -> WireError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        WireError::Truncated(what)
    } else {
        WireError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::encoder::{encode_record, write_header, write_trailer};
    use crate::wire::records::{DsoRow, Record};

    fn stream(records: &[Record]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_header(&mut buf).unwrap();
        for r in records {
            encode_record(r, &mut buf).unwrap();
        }
        write_trailer(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_empty_stream() {
        let tuples = decode_stream(&stream(&[])).unwrap();
        assert!(tuples.is_empty());
    }

    #[test]
    fn test_bad_signature() {
        let mut bytes = stream(&[]);
        bytes[0] = b'X';
        assert!(matches!(decode_stream(&bytes), Err(WireError::BadSignature)));
    }

    #[test]
    fn test_missing_trailer_is_truncation() {
        let mut bytes = stream(&[Record::Dso(DsoRow {
            id: 1,
            name: "libc.so.6".to_string(),
        })]);
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            decode_stream(&bytes),
            Err(WireError::Truncated("tuple header"))
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        let mut bytes = stream(&[]);
        bytes.push(0);
        assert!(matches!(decode_stream(&bytes), Err(WireError::TrailingBytes)));
    }

    #[test]
    fn test_field_as_i64_widths() {
        assert_eq!(field_as_i64(&(-2i16).to_be_bytes()), Some(-2));
        assert_eq!(field_as_i64(&70000i32.to_be_bytes()), Some(70000));
        assert_eq!(field_as_i64(&i64::MIN.to_be_bytes()), Some(i64::MIN));
        assert_eq!(field_as_i64(&[1, 2, 3]), None);
    }
}
