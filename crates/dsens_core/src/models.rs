//! Working-model fits: logistic propensity, linear prognosis, and the
//! pilot-sample split feeding the prognostic method.
//!
//! Both fits go through the weighted normal equations with a Cholesky
//! solve; a failed factorization (rank deficiency) or non-convergent IRLS
//! surfaces as `ModelFitFailure` and is handled per replication by the
//! harness, never panicking.

use nalgebra::{Cholesky, DMatrix, DVector};
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::sigmoid;
use crate::distance::MahalanobisDistance;
use crate::error::SimError;
use crate::generate::Dataset;
use crate::matching::optimal_match;

const IRLS_MAX_ITERATIONS: usize = 25;
const IRLS_TOLERANCE: f64 = 1e-8;

/// Logistic regression fit by iteratively reweighted least squares.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    /// Intercept followed by one coefficient per covariate.
    coef: DVector<f64>,
}

impl LogisticModel {
    /// Fit on the units in `rows` with `y[i]` as the binary response.
    pub fn fit(x: &DMatrix<f64>, y: &[bool], rows: &[usize]) -> Result<Self, SimError> {
        let design = design_matrix(x, rows);
        let response = DVector::from_iterator(
            rows.len(),
            rows.iter().map(|&i| if y[i] { 1.0 } else { 0.0 }),
        );
        let dim = design.ncols();
        let mut beta = DVector::<f64>::zeros(dim);

        for _ in 0..IRLS_MAX_ITERATIONS {
            let eta = &design * &beta;
            let mu = eta.map(sigmoid);
            // Clamp working weights away from zero so near-separated fits
            // fail through non-convergence instead of a division blowup.
            let weights = mu.map(|m| (m * (1.0 - m)).max(1e-10));

            let mut xtwx = DMatrix::<f64>::zeros(dim, dim);
            let mut xtwz = DVector::<f64>::zeros(dim);
            for r in 0..design.nrows() {
                let row = design.row(r);
                let w = weights[r];
                let z = eta[r] + (response[r] - mu[r]) / w;
                for a in 0..dim {
                    xtwz[a] += w * row[a] * z;
                    for b in 0..dim {
                        xtwx[(a, b)] += w * row[a] * row[b];
                    }
                }
            }

            let chol = Cholesky::new(xtwx).ok_or_else(|| {
                SimError::ModelFitFailure("rank-deficient design in logistic fit".into())
            })?;
            let next = chol.solve(&xtwz);
            let delta = (&next - &beta).amax();
            beta = next;
            if delta < IRLS_TOLERANCE {
                return Ok(Self { coef: beta });
            }
        }
        Err(SimError::ModelFitFailure(
            "logistic IRLS did not converge".into(),
        ))
    }

    /// Predicted propensity logit for any unit, fitted or not.
    pub fn predict_logit(&self, x: &DMatrix<f64>, unit: usize) -> f64 {
        let mut eta = self.coef[0];
        for j in 0..x.ncols() {
            eta += self.coef[j + 1] * x[(unit, j)];
        }
        eta
    }
}

/// Ordinary least squares fit via the normal equations.
#[derive(Debug, Clone)]
pub struct LinearModel {
    coef: DVector<f64>,
}

impl LinearModel {
    /// Fit on the units in `rows` with `y[i]` as the response.
    pub fn fit(x: &DMatrix<f64>, y: &[f64], rows: &[usize]) -> Result<Self, SimError> {
        let design = design_matrix(x, rows);
        let response = DVector::from_iterator(rows.len(), rows.iter().map(|&i| y[i]));
        let xtx = design.transpose() * &design;
        let xty = design.transpose() * response;
        let chol = Cholesky::new(xtx).ok_or_else(|| {
            SimError::ModelFitFailure("rank-deficient design in linear fit".into())
        })?;
        Ok(Self {
            coef: chol.solve(&xty),
        })
    }

    /// Predicted outcome for any unit.
    pub fn predict(&self, x: &DMatrix<f64>, unit: usize) -> f64 {
        let mut value = self.coef[0];
        for j in 0..x.ncols() {
            value += self.coef[j + 1] * x[(unit, j)];
        }
        value
    }
}

fn design_matrix(x: &DMatrix<f64>, rows: &[usize]) -> DMatrix<f64> {
    let p = x.ncols();
    let mut design = DMatrix::<f64>::zeros(rows.len(), p + 1);
    for (r, &i) in rows.iter().enumerate() {
        design[(r, 0)] = 1.0;
        for j in 0..p {
            design[(r, j + 1)] = x[(i, j)];
        }
    }
    design
}

/// The prognostic method's two-phase split as an immutable value.
///
/// `pilot` holds the control units reserved for fitting the prognostic
/// regression; `remainder` holds every other unit (all treated plus the
/// unreserved controls), the only units eligible for the final match.
#[derive(Debug, Clone)]
pub struct PilotSplit {
    pub pilot: Vec<usize>,
    pub remainder: Vec<usize>,
}

/// Select the pilot sample: a k=2 Mahalanobis match of treated to controls,
/// then one control sampled per matched pair.
///
/// Fitting the prognosis on pilot controls only keeps treated outcomes out
/// of the working model; removing the pilot from the final match keeps the
/// fit sample and the analysis sample disjoint.
pub fn pilot_split(dataset: &Dataset, rng: &mut StdRng) -> Result<PilotSplit, SimError> {
    let treated = dataset.treated_indices();
    let controls = dataset.control_indices();
    if treated.is_empty() || controls.is_empty() {
        return Err(SimError::DegenerateSample(
            "pilot split needs both treated and control units".into(),
        ));
    }

    let all: Vec<usize> = (0..dataset.len()).collect();
    let metric = MahalanobisDistance::from_covariates(dataset, &all)?;
    let pairing = optimal_match(&treated, &controls, &metric, 2)?;

    let mut pilot: Vec<usize> = pairing
        .sets
        .iter()
        .map(|set| set.controls[rng.gen_range(0..set.controls.len())])
        .collect();
    pilot.sort_unstable();

    let pilot_lookup: std::collections::HashSet<usize> = pilot.iter().copied().collect();
    let remainder: Vec<usize> = (0..dataset.len())
        .filter(|i| !pilot_lookup.contains(i))
        .collect();

    Ok(PilotSplit { pilot, remainder })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::generate::generate;
    use rand::SeedableRng;

    #[test]
    fn logistic_recovers_generative_coefficients() {
        let mut rng = StdRng::seed_from_u64(71);
        let n = 4000;
        let mut x = DMatrix::<f64>::zeros(n, 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a: f64 = rng.sample(rand_distr::StandardNormal);
            let b: f64 = rng.sample(rand_distr::StandardNormal);
            x[(i, 0)] = a;
            x[(i, 1)] = b;
            let logit = -1.0 + 0.7 * a - 0.4 * b;
            y.push(rng.gen::<f64>() < sigmoid(logit));
        }
        let rows: Vec<usize> = (0..n).collect();
        let model = LogisticModel::fit(&x, &y, &rows).unwrap();
        assert!((model.coef[0] + 1.0).abs() < 0.2, "intercept {}", model.coef[0]);
        assert!((model.coef[1] - 0.7).abs() < 0.2);
        assert!((model.coef[2] + 0.4).abs() < 0.2);
    }

    #[test]
    fn logistic_rejects_duplicate_column() {
        let mut rng = StdRng::seed_from_u64(5);
        let n = 50;
        let mut x = DMatrix::<f64>::zeros(n, 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a: f64 = rng.sample(rand_distr::StandardNormal);
            x[(i, 0)] = a;
            x[(i, 1)] = a; // perfectly collinear
            y.push(rng.gen::<bool>());
        }
        let rows: Vec<usize> = (0..n).collect();
        assert!(matches!(
            LogisticModel::fit(&x, &y, &rows),
            Err(SimError::ModelFitFailure(_))
        ));
    }

    #[test]
    fn linear_fit_exact_on_noiseless_data() {
        let mut rng = StdRng::seed_from_u64(13);
        let n = 100;
        let mut x = DMatrix::<f64>::zeros(n, 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a: f64 = rng.sample(rand_distr::StandardNormal);
            let b: f64 = rng.sample(rand_distr::StandardNormal);
            x[(i, 0)] = a;
            x[(i, 1)] = b;
            y.push(2.0 + a - 0.5 * b);
        }
        let rows: Vec<usize> = (0..n).collect();
        let model = LinearModel::fit(&x, &y, &rows).unwrap();
        assert!((model.coef[0] - 2.0).abs() < 1e-8);
        assert!((model.coef[1] - 1.0).abs() < 1e-8);
        assert!((model.coef[2] + 0.5).abs() < 1e-8);
        assert!((model.predict(&x, 0) - y[0]).abs() < 1e-8);
    }

    #[test]
    fn pilot_split_partitions_the_sample() {
        let config = SimConfig::calibrated(600, 4, 0.5, 1, 1.0, 1.0, 60).unwrap();
        let dataset = generate(&config, &mut StdRng::seed_from_u64(23));
        let split = pilot_split(&dataset, &mut StdRng::seed_from_u64(99)).unwrap();

        let treated_count = dataset.treated_indices().len();
        assert_eq!(split.pilot.len(), treated_count);
        assert_eq!(split.pilot.len() + split.remainder.len(), dataset.len());
        // Pilot units are controls and never appear in the remainder.
        for &i in &split.pilot {
            assert!(!dataset.treated[i]);
            assert!(!split.remainder.contains(&i));
        }
        // All treated units stay in the remainder.
        for &t in &dataset.treated_indices() {
            assert!(split.remainder.contains(&t));
        }
    }

    #[test]
    fn pilot_split_deterministic_per_seed() {
        let config = SimConfig::calibrated(400, 4, 0.3, 1, 1.0, 1.0, 40).unwrap();
        let dataset = generate(&config, &mut StdRng::seed_from_u64(31));
        let a = pilot_split(&dataset, &mut StdRng::seed_from_u64(8)).unwrap();
        let b = pilot_split(&dataset, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a.pilot, b.pilot);
        assert_eq!(a.remainder, b.remainder);
    }
}
