//! Newline-delimited JSON event reader.
//!
//! Blank lines are skipped. A line that is not a valid event object is
//! fatal: a corrupt trace stream must not load partially.

use super::schema::TraceEvent;
use crate::utils::error::ParseError;
use log::debug;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

/// Parse a single event line
pub fn parse_event(line: &str) -> Result<TraceEvent, serde_json::Error> {
    serde_json::from_str(line)
}

/// Iterator over the events of a stream, in stream order
pub struct EventReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// Line number of the most recently returned event
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<TraceEvent, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(ParseError::Io(e))),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(parse_event(trimmed).map_err(|source| ParseError::Json {
                line: self.line_no,
                source,
            }));
        }
    }
}

/// Open an event stream; `-` reads standard input
pub fn open_events(path: &Path) -> Result<EventReader<Box<dyn BufRead>>, ParseError> {
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        debug!("Reading events from stdin");
        Box::new(BufReader::new(io::stdin()))
    } else {
        debug!("Reading events from: {}", path.display());
        Box::new(BufReader::new(File::open(path)?))
    };
    Ok(EventReader::new(reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::schema::{SampleEvent, ThreadEvent};
    use std::io::Cursor;

    #[test]
    fn test_parse_sample_with_extra_fields() {
        let event = parse_event(
            r#"{"kind":"sample","sample_id":1,"tid":42,"dso_id":2,"symbol_id":3,
                "sym_offset":4,"ip":4096,"time":10,"cpu":0,"insn":[144],
                "to_ip":0,"branch_type":0,"in_tx":false}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            TraceEvent::Sample(SampleEvent {
                sample_id: 1,
                tid: 42,
                dso_id: 2,
                symbol_id: 3,
                sym_offset: 4,
                ip: 4096,
                time: 10,
                cpu: 0,
                insn: vec![0x90],
            })
        );
    }

    #[test]
    fn test_unknown_kind_is_unhandled() {
        let event = parse_event(r#"{"kind":"lost_samples","count":3}"#).unwrap();
        assert_eq!(event, TraceEvent::Unhandled);
    }

    #[test]
    fn test_acknowledged_kinds_ignore_fields() {
        let event = parse_event(r#"{"kind":"comm","comm_id":1,"comm_str":"ls"}"#).unwrap();
        assert_eq!(event, TraceEvent::Comm {});
    }

    #[test]
    fn test_reader_skips_blank_lines_and_reports_line() {
        let input = "{\"kind\":\"thread\",\"tid\":1,\"pid\":1}\n\n{\"kind\":\"thread\"";
        let mut reader = EventReader::new(Cursor::new(input));

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first, TraceEvent::Thread(ThreadEvent { tid: 1, pid: 1 }));

        match reader.next().unwrap() {
            Err(ParseError::Json { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected JSON error, got {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_out_of_range_dso_id_is_rejected() {
        let result = parse_event(r#"{"kind":"dso","dso_id":70000,"short_name":"x"}"#);
        assert!(result.is_err());
    }
}
