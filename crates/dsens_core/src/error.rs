use std::fmt;

/// Errors raised while running one replication of the study.
///
/// Everything except `InvalidConfig` is recoverable: the harness records the
/// replication as failed and moves on. `InvalidConfig` means the caller built
/// an impossible configuration and should fail before any replication runs.
#[derive(Debug)]
pub enum SimError {
    /// Not enough control units to give every treated unit its full match set.
    InfeasibleMatch { needed: usize, available: usize },
    /// Too few treated/control units or matched sets to compute anything.
    DegenerateSample(String),
    /// A working model (logistic or linear) failed to fit.
    ModelFitFailure(String),
    /// Malformed configuration; fails fast before the replication loop.
    InvalidConfig(String),
}

impl SimError {
    /// Whether the harness should record this failure and continue the sweep.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SimError::InvalidConfig(_))
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InfeasibleMatch { needed, available } => write!(
                f,
                "infeasible match: {needed} control slots needed, {available} controls available"
            ),
            SimError::DegenerateSample(msg) => write!(f, "degenerate sample: {msg}"),
            SimError::ModelFitFailure(msg) => write!(f, "model fit failure: {msg}"),
            SimError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}
