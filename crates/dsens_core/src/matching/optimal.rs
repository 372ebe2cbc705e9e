//! Optimal 1-to-k matching via minimum-cost bipartite assignment.
//!
//! Each treated unit is expanded into `ratio` capacity-1 rows; controls are
//! columns; weights are negated distances. The Kuhn-Munkres solver then
//! finds the assignment maximizing total weight, which is the minimum-cost
//! b-matching of the original problem. Global optimality is the contract:
//! the study's conclusions compare methods at their best achievable match,
//! so a greedy heuristic would bias the comparison.

use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

use crate::distance::MatchDistance;
use crate::error::SimError;

use super::types::{MatchedSet, Matching};

/// Scale factor converting f64 distances to i64 weights for the solver.
const SCALE: f64 = 1_000_000.0;

/// Simple matrix type implementing pathfinding's Weights for i64.
struct I64Weights(Vec<Vec<i64>>);

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        I64Weights(
            self.0
                .iter()
                .map(|r| r.iter().map(|&x| x.saturating_neg()).collect())
                .collect(),
        )
    }
}

/// Convert a distance to a solver weight (negate, scale, clamp).
fn distance_to_weight(distance: f64) -> i64 {
    let w = -distance * SCALE;
    if w >= i64::MAX as f64 {
        i64::MAX
    } else if w <= i64::MIN as f64 {
        i64::MIN
    } else {
        w as i64
    }
}

/// Compute the minimum-total-distance assignment of `ratio` distinct
/// controls to every treated unit.
///
/// Fails with `InfeasibleMatch` when the control pool cannot cover
/// `ratio * treated.len()` slots, and with `DegenerateSample` when either
/// side is empty; a partial assignment is never returned. Deterministic:
/// the weight matrix is built in input order and the solver breaks ties by
/// its fixed column scan, so identical inputs give identical matchings.
pub fn optimal_match(
    treated: &[usize],
    controls: &[usize],
    dist: &dyn MatchDistance,
    ratio: usize,
) -> Result<Matching, SimError> {
    if ratio == 0 {
        return Err(SimError::InvalidConfig("match ratio must be positive".into()));
    }
    if treated.is_empty() || controls.is_empty() {
        return Err(SimError::DegenerateSample(
            "matching needs at least one treated and one control unit".into(),
        ));
    }
    let needed = treated.len() * ratio;
    if controls.len() < needed {
        return Err(SimError::InfeasibleMatch {
            needed,
            available: controls.len(),
        });
    }

    // Row r stands for slot r % ratio of treated[r / ratio]; duplicated rows
    // share a weight column, which is exactly capacity-ratio demand.
    let mut matrix = Vec::with_capacity(needed);
    for &t in treated {
        let row: Vec<i64> = controls
            .iter()
            .map(|&c| distance_to_weight(dist.distance(t, c)))
            .collect();
        for _ in 0..ratio {
            matrix.push(row.clone());
        }
    }

    let (_total, assignment) = kuhn_munkres(&I64Weights(matrix));

    let mut sets = Vec::with_capacity(treated.len());
    let mut total_distance = 0.0;
    for (slot, &t) in treated.iter().enumerate() {
        let mut assigned: Vec<usize> = assignment[slot * ratio..(slot + 1) * ratio]
            .iter()
            .map(|&col| controls[col])
            .collect();
        assigned.sort_unstable();
        for &c in &assigned {
            total_distance += dist.distance(t, c);
        }
        sets.push(MatchedSet {
            treated: t,
            controls: assigned,
        });
    }

    Ok(Matching {
        sets,
        total_distance,
    })
}
