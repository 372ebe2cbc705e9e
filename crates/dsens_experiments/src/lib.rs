//! Replication harness for the matching-estimator study.
//!
//! This crate drives the `dsens_core` engine across parameter grids:
//! generating per-cell plans with deterministic seeds, running R
//! replications per (rho, k) cell with failure tolerance, sweeping cells in
//! parallel with rayon, and exporting the flat result table consumed by the
//! reporting layer.
//!
//! # Quick Start
//!
//! ```no_run
//! use dsens_core::Method;
//! use dsens_experiments::{run_parallel_cells, GridSpace};
//!
//! let plans = GridSpace::new(2000, 10)
//!     .rho(vec![0.0, 0.25, 0.5, 0.75, 1.0])
//!     .ratio(vec![1, 2, 3])
//!     .replications(500)
//!     .generate()
//!     .unwrap();
//! let reports = run_parallel_cells(&plans, &Method::ALL, None, true);
//! ```

pub mod export;
pub mod parameters;
pub mod report;
pub mod runner;

pub use export::{cell_file_name, write_cell_csv, write_cell_json, write_cells_csv};
pub use parameters::{CellPlan, GridSpace};
pub use report::{CellReport, ReplicationRecord};
pub use runner::{run_cell, run_parallel_cells};
