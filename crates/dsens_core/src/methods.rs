//! The three matching-method pipelines under study, plus the oracle
//! diagnostic benchmark.
//!
//! Every pipeline consumes one immutable dataset and produces a matching,
//! its ATT estimate, and its design sensitivity. The prognostic pipeline is
//! the two-phase one: pilot split, fit-on-pilot-controls, match on the
//! remainder.

use std::fmt;
use std::str::FromStr;

use nalgebra::DVector;
use rand::rngs::StdRng;

use crate::config::SimConfig;
use crate::distance::{MahalanobisDistance, ScalarScoreDistance};
use crate::error::SimError;
use crate::estimator::{att_estimate, design_sensitivity};
use crate::generate::Dataset;
use crate::matching::{optimal_match, Matching};
use crate::models::{pilot_split, LinearModel, LogisticModel};

/// The matching methods compared by the study.
///
/// Labels are a compatibility contract with the reporting layer; do not
/// rename them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Propensity,
    Mahalanobis,
    Prognostic,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Propensity, Method::Mahalanobis, Method::Prognostic];

    pub fn label(&self) -> &'static str {
        match self {
            Method::Propensity => "propensity",
            Method::Mahalanobis => "mahalanobis",
            Method::Prognostic => "prognostic",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Method {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "propensity" => Ok(Method::Propensity),
            "mahalanobis" => Ok(Method::Mahalanobis),
            "prognostic" => Ok(Method::Prognostic),
            other => Err(SimError::InvalidConfig(format!(
                "unknown method '{other}' (expected propensity|mahalanobis|prognostic)"
            ))),
        }
    }
}

/// Result of running one method on one dataset.
#[derive(Debug, Clone)]
pub struct MethodOutcome {
    /// ATT point estimate.
    pub estimate: f64,
    /// Design sensitivity Gamma-tilde.
    pub gamma: f64,
    /// Number of matched sets (treated units matched).
    pub matched_sets: usize,
    /// Total matching distance of the optimal assignment.
    pub total_distance: f64,
}

/// Run one method against a dataset.
///
/// The RNG is only consumed by the prognostic method's pilot sampling; the
/// other two methods are fully deterministic given the dataset.
pub fn run_method(
    method: Method,
    dataset: &Dataset,
    config: &SimConfig,
    rng: &mut StdRng,
) -> Result<MethodOutcome, SimError> {
    let treated = dataset.treated_indices();
    let controls = dataset.control_indices();
    if treated.is_empty() || controls.is_empty() {
        return Err(SimError::DegenerateSample(
            "dataset has no treated or no control units".into(),
        ));
    }

    match method {
        Method::Propensity => {
            let all: Vec<usize> = (0..dataset.len()).collect();
            let model = LogisticModel::fit(&dataset.covariates, &dataset.treated, &all)?;
            let scores: Vec<f64> = (0..dataset.len())
                .map(|i| model.predict_logit(&dataset.covariates, i))
                .collect();
            let dist = ScalarScoreDistance::new(scores);
            summarize(
                optimal_match(&treated, &controls, &dist, config.ratio)?,
                dataset,
            )
        }
        Method::Mahalanobis => {
            let all: Vec<usize> = (0..dataset.len()).collect();
            let dist = MahalanobisDistance::from_covariates(dataset, &all)?;
            summarize(
                optimal_match(&treated, &controls, &dist, config.ratio)?,
                dataset,
            )
        }
        Method::Prognostic => {
            let split = pilot_split(dataset, rng)?;

            // Prognosis is fit on pilot-control outcomes only; the treated
            // group never leaks into the working model.
            let prognosis =
                LinearModel::fit(&dataset.covariates, &dataset.outcomes, &split.pilot)?;
            let all: Vec<usize> = (0..dataset.len()).collect();
            let propensity = LogisticModel::fit(&dataset.covariates, &dataset.treated, &all)?;

            let score_rows: Vec<DVector<f64>> = (0..dataset.len())
                .map(|i| {
                    DVector::from_vec(vec![
                        propensity.predict_logit(&dataset.covariates, i),
                        prognosis.predict(&dataset.covariates, i),
                    ])
                })
                .collect();
            // Joint metric over the units still available after pilot
            // removal; the covariance is recomputed on that shrunken set.
            let dist = MahalanobisDistance::from_rows(score_rows, &split.remainder)?;

            let eligible_controls: Vec<usize> = split
                .remainder
                .iter()
                .copied()
                .filter(|&i| !dataset.treated[i])
                .collect();
            summarize(
                optimal_match(&treated, &eligible_controls, &dist, config.ratio)?,
                dataset,
            )
        }
    }
}

/// Oracle benchmark: match on the generator's true (phi, psi) scores.
///
/// Diagnostics only. Keeping this outside `run_method` preserves the
/// invariant that the methods under test never see the latent scores.
pub fn run_oracle(dataset: &Dataset, config: &SimConfig) -> Result<MethodOutcome, SimError> {
    let treated = dataset.treated_indices();
    let controls = dataset.control_indices();
    if treated.is_empty() || controls.is_empty() {
        return Err(SimError::DegenerateSample(
            "dataset has no treated or no control units".into(),
        ));
    }

    let score_rows: Vec<DVector<f64>> = (0..dataset.len())
        .map(|i| DVector::from_vec(vec![dataset.true_logit[i], dataset.true_prognosis[i]]))
        .collect();
    let all: Vec<usize> = (0..dataset.len()).collect();
    let dist = MahalanobisDistance::from_rows(score_rows, &all)?;
    summarize(
        optimal_match(&treated, &controls, &dist, config.ratio)?,
        dataset,
    )
}

fn summarize(matching: Matching, dataset: &Dataset) -> Result<MethodOutcome, SimError> {
    let estimate = att_estimate(&matching, &dataset.outcomes)?;
    let gamma = design_sensitivity(&matching, &dataset.outcomes)?;
    Ok(MethodOutcome {
        estimate,
        gamma,
        matched_sets: matching.len(),
        total_distance: matching.total_distance,
    })
}
