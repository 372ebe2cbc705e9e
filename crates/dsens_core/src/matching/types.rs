/// One treated unit and the controls assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedSet {
    pub treated: usize,
    /// Assigned control indices, sorted ascending for deterministic output.
    pub controls: Vec<usize>,
}

/// A complete matching: every treated unit with its full control set.
///
/// Invariant: no control index appears in more than one set, and every set
/// holds exactly the requested ratio of controls. Partial assignments are
/// never constructed; infeasible inputs fail before a `Matching` exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Matching {
    pub sets: Vec<MatchedSet>,
    /// Sum of treated-to-control distances across all assignments.
    pub total_distance: f64,
}

impl Matching {
    /// Number of matched sets (treated units).
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Total number of control units used across all sets.
    pub fn control_count(&self) -> usize {
        self.sets.iter().map(|s| s.controls.len()).sum()
    }
}
