//! Distance specifications consumed by the matcher.
//!
//! Distances are indexed by global unit index so a specification can be
//! built once per replication and shared across treated/control subsets.
//! The Mahalanobis metric is always recomputed from the currently available
//! units: when the prognostic method removes its pilot sample, the metric
//! for the final match is rebuilt on the shrunken set rather than reusing
//! the full-sample covariance.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::error::SimError;
use crate::generate::Dataset;

/// A rule mapping a pair of units to a nonnegative dissimilarity.
///
/// Implementations must be symmetric and give `distance(i, i) == 0`.
pub trait MatchDistance {
    fn distance(&self, a: usize, b: usize) -> f64;
}

/// Mahalanobis distance over per-unit feature vectors.
///
/// Covers two of the study's three specifications: raw covariates, and the
/// joint (propensity logit, prognostic score) plane, which is just the same
/// metric over 2-vectors. The covariance is the sample covariance of the
/// feature rows restricted to `available`.
pub struct MahalanobisDistance {
    rows: Vec<DVector<f64>>,
    chol: Cholesky<f64, Dyn>,
}

impl MahalanobisDistance {
    /// Build from arbitrary per-unit feature rows. `rows` is indexed by
    /// global unit index; only `available` rows enter the covariance.
    pub fn from_rows(rows: Vec<DVector<f64>>, available: &[usize]) -> Result<Self, SimError> {
        let dim = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| SimError::DegenerateSample("no units for distance metric".into()))?;
        if available.len() < dim + 1 {
            return Err(SimError::DegenerateSample(format!(
                "{} available units cannot identify a {dim}-dimensional covariance",
                available.len()
            )));
        }

        let mut mean = DVector::<f64>::zeros(dim);
        for &i in available {
            mean += &rows[i];
        }
        mean /= available.len() as f64;

        let mut cov = DMatrix::<f64>::zeros(dim, dim);
        for &i in available {
            let centered = &rows[i] - &mean;
            cov += &centered * centered.transpose();
        }
        cov /= (available.len() - 1) as f64;

        let chol = Cholesky::new(cov).ok_or_else(|| {
            SimError::ModelFitFailure("singular covariance among available units".into())
        })?;
        Ok(Self { rows, chol })
    }

    /// Raw-covariate variant: feature rows are the dataset's covariates.
    pub fn from_covariates(dataset: &Dataset, available: &[usize]) -> Result<Self, SimError> {
        let rows = (0..dataset.len())
            .map(|i| dataset.covariates.row(i).transpose())
            .collect();
        Self::from_rows(rows, available)
    }
}

impl MatchDistance for MahalanobisDistance {
    fn distance(&self, a: usize, b: usize) -> f64 {
        let diff = &self.rows[a] - &self.rows[b];
        let solved = self.chol.solve(&diff);
        diff.dot(&solved).max(0.0).sqrt()
    }
}

/// Absolute difference of a scalar per-unit score (propensity logit).
pub struct ScalarScoreDistance {
    scores: Vec<f64>,
}

impl ScalarScoreDistance {
    pub fn new(scores: Vec<f64>) -> Self {
        Self { scores }
    }
}

impl MatchDistance for ScalarScoreDistance {
    fn distance(&self, a: usize, b: usize) -> f64 {
        (self.scores[a] - self.scores[b]).abs()
    }
}
