//! Dense ids for distinct instruction pointers.
//!
//! Ids are handed out in first-seen order starting at 1; id 0 is the
//! reserved "unknown" instruction. Each entry keeps an execution counter
//! and the first annotated opcode/symbol/offset snapshot.

use crate::utils::config::EXEC_COUNT_UNRESOLVED;
use crate::wire::InstructionRow;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Entry {
    ip: u64,
    exec_count: i32,
    symbol_id: Option<i32>,
    sym_offset: Option<i64>,
    opcode: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct InstructionTable {
    ids: HashMap<u64, i32>,
    /// Indexed by id - 1
    entries: Vec<Entry>,
}

impl InstructionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `ip`, allocating the next one on first sight
    pub fn resolve(&mut self, ip: u64) -> i32 {
        if let Some(&id) = self.ids.get(&ip) {
            return id;
        }

        let id = (self.entries.len() + 1) as i32;
        self.entries.push(Entry {
            ip,
            exec_count: EXEC_COUNT_UNRESOLVED,
            symbol_id: None,
            sym_offset: None,
            opcode: None,
        });
        self.ids.insert(ip, id);
        id
    }

    /// Count one annotated execution of `ip`.
    ///
    /// The first annotation stores the snapshot; later ones only bump the
    /// counter. Opcode bytes at one address are assumed not to change.
    pub fn record(&mut self, ip: u64, symbol_id: i32, opcode: &[u8], sym_offset: i64) {
        let id = self.resolve(ip);
        let entry = &mut self.entries[(id - 1) as usize];

        if entry.exec_count == EXEC_COUNT_UNRESOLVED {
            entry.exec_count = 1;
            entry.symbol_id = Some(symbol_id);
            entry.sym_offset = Some(sym_offset);
            entry.opcode = Some(opcode.to_vec());
        } else {
            entry.exec_count = entry.exec_count.saturating_add(1);
        }
    }

    pub fn id_of(&self, ip: u64) -> Option<i32> {
        self.ids.get(&ip).copied()
    }

    pub fn exec_count(&self, ip: u64) -> Option<i32> {
        self.id_of(ip)
            .map(|id| self.entries[(id - 1) as usize].exec_count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One row per distinct pointer, in id order
    pub fn into_rows(self) -> impl Iterator<Item = InstructionRow> {
        self.entries
            .into_iter()
            .enumerate()
            .map(|(index, e)| InstructionRow {
                id: (index + 1) as i32,
                symbol_id: e.symbol_id,
                ip: e.ip,
                exec_count: e.exec_count,
                sym_offset: e.sym_offset,
                opcode: e.opcode,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ids_are_dense_from_one() {
        let mut t = InstructionTable::new();
        assert_eq!(t.resolve(0x400), 1);
        assert_eq!(t.resolve(0x500), 2);
        assert_eq!(t.resolve(0x400), 1);
        assert_eq!(t.resolve(0x600), 3);
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_resolved_but_unrecorded_keeps_sentinel() {
        let mut t = InstructionTable::new();
        t.resolve(0x400);
        assert_eq!(t.exec_count(0x400), Some(-1));

        let rows: Vec<_> = t.into_rows().collect();
        assert_eq!(
            rows,
            vec![InstructionRow {
                id: 1,
                symbol_id: None,
                ip: 0x400,
                exec_count: -1,
                sym_offset: None,
                opcode: None,
            }]
        );
    }

    #[test]
    fn test_first_snapshot_wins() {
        let mut t = InstructionTable::new();
        t.resolve(0x400);
        t.record(0x400, 10, &[0x90], 4);
        t.record(0x400, 11, &[0xcc, 0xcc], 8);
        t.record(0x400, 12, &[], 0);

        let row = t.into_rows().next().unwrap();
        assert_eq!(row.exec_count, 3);
        assert_eq!(row.symbol_id, Some(10));
        assert_eq!(row.sym_offset, Some(4));
        assert_eq!(row.opcode, Some(vec![0x90]));
    }

    #[test]
    fn test_record_without_resolve_allocates() {
        let mut t = InstructionTable::new();
        t.record(0x700, 1, &[0xc3], 0);
        assert_eq!(t.id_of(0x700), Some(1));
        assert_eq!(t.exec_count(0x700), Some(1));
    }

    #[test]
    fn test_rows_follow_id_order() {
        let mut t = InstructionTable::new();
        for ip in [0x30, 0x10, 0x20, 0x10] {
            t.resolve(ip);
        }
        let ips: Vec<u64> = t.into_rows().map(|r| r.ip).collect();
        assert_eq!(ips, vec![0x30, 0x10, 0x20]);
    }
}
