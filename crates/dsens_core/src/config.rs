//! Study configuration and intercept calibration.
//!
//! A `SimConfig` fixes one grid cell of the study: sample size, covariate
//! dimension, the propensity/prognosis correlation knob rho, the match
//! ratio, and the generative constants. The treatment-intercept `c` is not
//! chosen directly; it is calibrated so that the expected treated-group
//! size hits `target_treated` under the generative model.

use crate::error::SimError;

/// Standard logistic function.
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// One grid cell's full parameterization. Immutable after construction.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimConfig {
    /// Sample size N.
    pub n: usize,
    /// Covariate dimension p (at least 2; the prognostic score uses X1, X2).
    pub p: usize,
    /// Correlation-control knob between propensity and prognosis, in [0, 1].
    pub rho: f64,
    /// Calibrated treatment-assignment intercept.
    pub c: f64,
    /// Outcome noise scale.
    pub sigma: f64,
    /// True treatment effect on the treated.
    pub tau: f64,
    /// Controls matched to each treated unit.
    pub ratio: usize,
    /// Expected treated-group size the intercept was calibrated to.
    pub target_treated: usize,
}

impl SimConfig {
    /// Build a validated configuration with `c` calibrated for
    /// `target_treated` expected treated units.
    pub fn calibrated(
        n: usize,
        p: usize,
        rho: f64,
        ratio: usize,
        sigma: f64,
        tau: f64,
        target_treated: usize,
    ) -> Result<Self, SimError> {
        let c = calibrate_intercept(n, target_treated)?;
        let config = Self {
            n,
            p,
            rho,
            c,
            sigma,
            tau,
            ratio,
            target_treated,
        };
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on malformed parameters (programmer error, not a
    /// per-replication failure).
    pub fn validate(&self) -> Result<(), SimError> {
        if self.n == 0 {
            return Err(SimError::InvalidConfig("n must be positive".into()));
        }
        if self.p < 2 {
            return Err(SimError::InvalidConfig(
                "p must be at least 2 (prognosis uses X1 and X2)".into(),
            ));
        }
        if self.ratio == 0 {
            return Err(SimError::InvalidConfig("match ratio must be positive".into()));
        }
        if !(self.sigma > 0.0) {
            return Err(SimError::InvalidConfig("sigma must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.rho) {
            return Err(SimError::InvalidConfig(format!(
                "rho must lie in [0, 1], got {}",
                self.rho
            )));
        }
        Ok(())
    }
}

/// Expected treated count `n * E[sigmoid(Z/3 - c)]` for Z standard normal,
/// evaluated by trapezoid quadrature on [-8, 8].
///
/// This is the deterministic calibration target: no sampling, so calibration
/// is bit-reproducible across runs and processes.
pub fn expected_treated(c: f64, n: usize) -> f64 {
    const POINTS: usize = 513;
    const LO: f64 = -8.0;
    const HI: f64 = 8.0;
    let step = (HI - LO) / (POINTS - 1) as f64;
    let norm = 1.0 / (2.0 * std::f64::consts::PI).sqrt();
    let mut acc = 0.0;
    for i in 0..POINTS {
        let z = LO + step * i as f64;
        let density = norm * (-0.5 * z * z).exp();
        let value = sigmoid(z / 3.0 - c) * density;
        let weight = if i == 0 || i == POINTS - 1 { 0.5 } else { 1.0 };
        acc += weight * value;
    }
    n as f64 * acc * step
}

/// Solve for the intercept `c` giving `expected_treated(c, n) == target`
/// by bisection.
///
/// `expected_treated` is strictly decreasing in `c`, so the root is unique.
/// A target at or above `n` is impossible (the Bernoulli mean is below 1)
/// and rejected up front.
pub fn calibrate_intercept(n: usize, target: usize) -> Result<f64, SimError> {
    if target == 0 {
        return Err(SimError::InvalidConfig(
            "target treated count must be positive".into(),
        ));
    }
    if target >= n {
        return Err(SimError::InvalidConfig(format!(
            "cannot calibrate {target} expected treated units out of n = {n}"
        )));
    }
    let goal = target as f64;
    let mut lo = -20.0;
    let mut hi = 20.0;
    // f(lo) ~ n - goal > 0, f(hi) ~ -goal < 0.
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if expected_treated(mid, n) > goal {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-10 {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}
