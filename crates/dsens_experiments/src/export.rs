//! Flat-file export of cell results.
//!
//! One delimited table per grid cell with the fixed column set
//! `method,k,rho,estimate,gamma`. The reporting layer consumes these files
//! read-only; failed replications show up as empty estimate/gamma fields.
//! A JSON variant of the same rows exists for reporting tools that prefer
//! structured input over CSV.

use std::fs::File;
use std::path::Path;

use crate::report::{CellReport, ReplicationRecord};

/// Canonical result-file name for a cell, keyed the way the shell-loop
/// driver launches processes (one per rho value).
pub fn cell_file_name(rho: f64, p: usize) -> String {
    format!("cell_rho{rho:.2}_p{p}.csv")
}

/// Write one cell's rows to `path` as CSV.
pub fn write_cell_csv(path: &Path, report: &CellReport) -> Result<(), Box<dyn std::error::Error>> {
    write_records_csv(path, report.records.iter())
}

/// Write several cells' rows to one table at `path`, in input order.
///
/// Used by the batch binary when a single rho process covers several k
/// values; the rows stream through one writer, so the per-cell failure
/// audit on each `CellReport` stays untouched.
pub fn write_cells_csv(
    path: &Path,
    reports: &[CellReport],
) -> Result<(), Box<dyn std::error::Error>> {
    write_records_csv(path, reports.iter().flat_map(|r| r.records.iter()))
}

fn write_records_csv<'a>(
    path: &Path,
    records: impl Iterator<Item = &'a ReplicationRecord>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record(["method", "k", "rho", "estimate", "gamma"])?;
    for record in records {
        wtr.write_record([
            record.method,
            &record.ratio.to_string(),
            &record.rho.to_string(),
            &record.estimate.map(|v| v.to_string()).unwrap_or_default(),
            &record.gamma.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one cell's rows to `path` as pretty-printed JSON.
pub fn write_cell_json(path: &Path, report: &CellReport) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &report.records)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReplicationRecord;
    use std::collections::BTreeMap;
    use std::io::Read;

    fn sample_report() -> CellReport {
        CellReport {
            cell_id: "rho0.50_k3".into(),
            replications: 2,
            records: vec![
                ReplicationRecord {
                    method: "propensity",
                    ratio: 3,
                    rho: 0.5,
                    estimate: Some(0.97),
                    gamma: Some(2.25),
                },
                ReplicationRecord {
                    method: "prognostic",
                    ratio: 3,
                    rho: 0.5,
                    estimate: None,
                    gamma: None,
                },
            ],
            failures: BTreeMap::new(),
        }
    }

    fn read_to_string(path: &Path) -> String {
        let mut contents = String::new();
        File::open(path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
    }

    #[test]
    fn csv_has_contract_columns_and_null_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(cell_file_name(0.5, 10));
        write_cell_csv(&path, &sample_report()).unwrap();

        let contents = read_to_string(&path);
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "method,k,rho,estimate,gamma");
        assert_eq!(lines[1], "propensity,3,0.5,0.97,2.25");
        assert_eq!(lines[2], "prognostic,3,0.5,,");
    }

    #[test]
    fn merged_table_streams_all_rows_and_keeps_reports_intact() {
        let mut second = sample_report();
        second.cell_id = "rho0.50_k1".into();
        second.failures.insert("mahalanobis", 1);
        let reports = vec![sample_report(), second];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        write_cells_csv(&path, &reports).unwrap();

        let contents = read_to_string(&path);
        // One header plus every record from every report, in input order.
        assert_eq!(contents.lines().count(), 5);
        assert_eq!(contents.lines().nth(1), contents.lines().nth(3));

        // Writing never rewrites the audit trail on the reports themselves.
        assert_eq!(reports[0].failure_count(), 0);
        assert_eq!(reports[1].failure_count(), 1);
        assert_eq!(reports[1].cell_id, "rho0.50_k1");
    }

    #[test]
    fn json_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cell.json");
        let report = sample_report();
        write_cell_json(&path, &report).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&read_to_string(&path)).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["method"], "propensity");
        assert_eq!(rows[0]["gamma"], 2.25);
        assert!(rows[1]["estimate"].is_null());
    }

    #[test]
    fn file_name_is_stable() {
        assert_eq!(cell_file_name(0.25, 10), "cell_rho0.25_p10.csv");
    }
}
