//! Simulation-and-matching engine for the matching-estimator design
//! sensitivity study.
//!
//! The crate generates synthetic observational datasets from a known causal
//! model, matches treated to control units under three distance
//! specifications (fitted propensity score, Mahalanobis on covariates, and
//! a joint propensity/prognostic score), and computes the ATT estimate and
//! Rosenbaum design sensitivity of each matched sample. The replication
//! harness that sweeps configurations lives in `dsens_experiments`; this
//! crate is pure computation with no I/O.

pub mod config;
pub mod distance;
pub mod error;
pub mod estimator;
pub mod generate;
pub mod matching;
pub mod methods;
pub mod models;

pub use config::{calibrate_intercept, expected_treated, sigmoid, SimConfig};
pub use distance::{MahalanobisDistance, MatchDistance, ScalarScoreDistance};
pub use error::SimError;
pub use estimator::{att_estimate, design_sensitivity};
pub use generate::{generate, Dataset};
pub use matching::{greedy_match, optimal_match, MatchedSet, Matching};
pub use methods::{run_method, run_oracle, Method, MethodOutcome};
