//! Collapse short-lived JIT modules into two pseudo-modules.
//!
//! HHVM writes every batch of generated code into a fresh
//! `jitted-<pid>-<n>.so`. Left alone, every batch is its own DSO and every
//! hop between batches shows up as a module transition. With collapsing on:
//!
//! - the first matching DSO becomes `hhvm-jitted.so` (pseudo-module A),
//! - the second matching DSO becomes `hhvm-pcre.so` (pseudo-module B),
//! - every later matching DSO writes no row of its own; its symbols and
//!   samples are routed to A, or to B when the symbol belongs to the PCRE
//!   JIT.
//!
//! Allocation depends on event order: the first two matches win the
//! pseudo ids for the whole run.

use crate::utils::config::{
    JIT_DSO_PATTERN, JIT_PSEUDO_DSO_NAME, PCRE_PSEUDO_DSO_NAME, PCRE_SYMBOL_PREFIX,
};
use crate::wire::DsoRow;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static JIT_DSO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(JIT_DSO_PATTERN).expect("JIT DSO pattern is valid"));

/// Whether a DSO short name looks like generated JIT code
pub fn is_jitted_dso_name(short_name: &str) -> bool {
    JIT_DSO_RE.is_match(short_name)
}

#[derive(Debug, Default)]
pub struct DsoCollapser {
    enabled: bool,
    /// DSO id that became pseudo-module A
    jit_pseudo: Option<i16>,
    /// DSO id that became pseudo-module B
    pcre_pseudo: Option<i16>,
    jitted: HashSet<i16>,
    /// Jitted DSOs that carried at least one PCRE JIT symbol
    pcre: HashSet<i16>,
}

impl DsoCollapser {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Row to write for a DSO event, or `None` when the DSO folds into a
    /// pseudo-module that already has its row.
    pub fn dso_row(&mut self, dso_id: i16, short_name: &str) -> Option<DsoRow> {
        if !self.enabled || !is_jitted_dso_name(short_name) {
            return Some(DsoRow {
                id: dso_id,
                name: short_name.to_string(),
            });
        }

        self.jitted.insert(dso_id);

        if self.jit_pseudo.is_none() {
            debug!("{} (id {}) becomes {}", short_name, dso_id, JIT_PSEUDO_DSO_NAME);
            self.jit_pseudo = Some(dso_id);
            return Some(DsoRow {
                id: dso_id,
                name: JIT_PSEUDO_DSO_NAME.to_string(),
            });
        }

        if self.pcre_pseudo.is_none() {
            debug!("{} (id {}) becomes {}", short_name, dso_id, PCRE_PSEUDO_DSO_NAME);
            self.pcre_pseudo = Some(dso_id);
            return Some(DsoRow {
                id: dso_id,
                name: PCRE_PSEUDO_DSO_NAME.to_string(),
            });
        }

        None
    }

    /// DSO id to store on a symbol row
    pub fn symbol_dso(&mut self, dso_id: i16, symbol_name: &str) -> i16 {
        if !self.enabled || !self.jitted.contains(&dso_id) {
            return dso_id;
        }

        if symbol_name.starts_with(PCRE_SYMBOL_PREFIX) {
            match self.pcre_pseudo {
                Some(pcre) => {
                    self.pcre.insert(dso_id);
                    return pcre;
                }
                None => warn!(
                    "PCRE JIT symbol {} seen before a second jitted DSO; keeping it in {}",
                    symbol_name, JIT_PSEUDO_DSO_NAME
                ),
            }
        }

        self.jit_pseudo.unwrap_or(dso_id)
    }

    /// DSO id used when comparing consecutive samples
    pub fn resolve(&self, dso_id: i16) -> i16 {
        if !self.enabled {
            return dso_id;
        }
        if self.pcre.contains(&dso_id) {
            if let Some(pcre) = self.pcre_pseudo {
                return pcre;
            }
        }
        if self.jitted.contains(&dso_id) {
            return self.jit_pseudo.unwrap_or(dso_id);
        }
        dso_id
    }
}
