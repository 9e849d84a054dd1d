//! Module transition tracking.
//!
//! Keeps exactly one previous sample. A transition is emitted when the
//! current sample's resolved DSO differs from the previous one, so a jump
//! becomes visible only once the sample on the far side arrives.

use super::collapse::DsoCollapser;
use crate::wire::DsoJumpRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PreviousSample {
    time: i64,
    instruction_id: i32,
    dso_id: i16,
}

#[derive(Debug, Default)]
pub struct DsoTransitionTracker {
    previous: Option<PreviousSample>,
    jumps: Vec<DsoJumpRow>,
}

impl DsoTransitionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample; returns the transition it completed, if any
    pub fn observe(
        &mut self,
        time: i64,
        instruction_id: i32,
        dso_id: i16,
        collapser: &DsoCollapser,
    ) -> Option<&DsoJumpRow> {
        let dso_id = collapser.resolve(dso_id);
        let current = PreviousSample {
            time,
            instruction_id,
            dso_id,
        };

        let emitted = match self.previous.replace(current) {
            Some(prev) if prev.dso_id != dso_id => {
                self.jumps.push(DsoJumpRow {
                    id: (self.jumps.len() + 1) as i32,
                    from_time: prev.time,
                    from_instruction_id: prev.instruction_id,
                    to_time: time,
                    to_instruction_id: instruction_id,
                });
                true
            }
            _ => false,
        };

        if emitted {
            self.jumps.last()
        } else {
            None
        }
    }

    pub fn jumps(&self) -> &[DsoJumpRow] {
        &self.jumps
    }

    pub fn len(&self) -> usize {
        self.jumps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jumps.is_empty()
    }

    pub fn into_rows(self) -> Vec<DsoJumpRow> {
        self.jumps
    }
}
