//! Result rows and per-cell reports.

use std::collections::BTreeMap;

/// One row of the result table: one (method, replication) within a cell.
///
/// Column names and method spellings are the compatibility contract with
/// the external reporting layer; `estimate`/`gamma` are `None` when the
/// replication failed for that method.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReplicationRecord {
    pub method: &'static str,
    /// Match ratio k.
    pub ratio: usize,
    pub rho: f64,
    pub estimate: Option<f64>,
    pub gamma: Option<f64>,
}

/// Everything one grid cell produced: the result rows plus the failure
/// audit trail the spec requires.
#[derive(Debug, Clone)]
pub struct CellReport {
    pub cell_id: String,
    pub replications: usize,
    pub records: Vec<ReplicationRecord>,
    /// Failed replications per method label.
    pub failures: BTreeMap<&'static str, usize>,
}

impl CellReport {
    /// Total failed (method, replication) pairs in this cell.
    pub fn failure_count(&self) -> usize {
        self.failures.values().sum()
    }
}
