//! Nearest-available greedy matching.
//!
//! Not used by the study pipelines (the contract there is global
//! optimality); kept as the sanity baseline for solver tests and benchmarks.

use crate::distance::MatchDistance;
use crate::error::SimError;

use super::types::{MatchedSet, Matching};

/// Assign each treated unit, in input order, its `ratio` nearest controls
/// still available. Ties break toward the lower control index.
///
/// Same feasibility contract as `optimal_match`: fails rather than
/// returning a partial assignment.
pub fn greedy_match(
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

    let mut available: Vec<usize> = controls.to_vec();
    let mut sets = Vec::with_capacity(treated.len());
    let mut total_distance = 0.0;

    for &t in treated {
        let mut ranked: Vec<(f64, usize)> =
            available.iter().map(|&c| (dist.distance(t, c), c)).collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let mut chosen: Vec<usize> = ranked[..ratio].iter().map(|&(_, c)| c).collect();
        for &(d, _) in &ranked[..ratio] {
            total_distance += d;
        }
        available.retain(|c| !chosen.contains(c));
        chosen.sort_unstable();
        sets.push(MatchedSet {
            treated: t,
            controls: chosen,
        });
    }

    Ok(Matching {
        sets,
        total_distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::ScalarScoreDistance;
    use crate::matching::optimal_match;

    #[test]
    fn picks_nearest_available() {
        let dist = ScalarScoreDistance::new(vec![0.0, 10.0, 0.5, 9.0]);
        let matching = greedy_match(&[0, 1], &[2, 3], &dist, 1).unwrap();
        assert_eq!(matching.sets[0].controls, vec![2]);
        assert_eq!(matching.sets[1].controls, vec![3]);
    }

    #[test]
    fn never_beats_optimal_on_random_instances() {
        for seed in 0..10u64 {
            let scores: Vec<f64> = (0..24)
                .map(|i| (((i as u64 + 1) * (seed + 3)) % 17) as f64 * 0.3)
                .collect();
            let dist = ScalarScoreDistance::new(scores);
            let treated: Vec<usize> = (0..4).collect();
            let controls: Vec<usize> = (4..24).collect();
            let greedy = greedy_match(&treated, &controls, &dist, 2).unwrap();
            let optimal = optimal_match(&treated, &controls, &dist, 2).unwrap();
            assert!(
                optimal.total_distance <= greedy.total_distance + 1e-9,
                "seed {seed}: optimal {} greedy {}",
                optimal.total_distance,
                greedy.total_distance
            );
        }
    }

    #[test]
    fn equal_distances_break_toward_lower_index() {
        // All controls equidistant from every treated unit; the ranking sort
        // must stay total and fall back to the index order.
        let dist = ScalarScoreDistance::new(vec![1.0; 8]);
        let matching = greedy_match(&[0, 1], &[5, 3, 7, 2], &dist, 2).unwrap();
        assert_eq!(matching.sets[0].controls, vec![2, 3]);
        assert_eq!(matching.sets[1].controls, vec![5, 7]);
    }

    #[test]
    fn respects_feasibility_contract() {
        let dist = ScalarScoreDistance::new(vec![0.0; 4]);
        assert!(matches!(
            greedy_match(&[0, 1], &[2, 3], &dist, 2),
            Err(SimError::InfeasibleMatch { .. })
        ));
    }
}
