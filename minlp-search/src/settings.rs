//! Configuration for the reliability brancher.

/// Reliability brancher options.
#[derive(Debug, Clone)]
pub struct BrancherSettings {
    /// Engine iteration cap per strong-branch solve.
    pub max_iterations: u32,

    /// Upper bound on unreliable candidates strong-branched per node.
    pub max_strong_cands: usize,

    /// Above this depth, strong branching is skipped entirely.
    pub max_depth: u32,

    /// Nodes that must pass between two strong-branchings of the same
    /// variable.
    pub min_node_dist: u64,

    /// Observations per direction needed to declare a pseudo-cost
    /// reliable.
    pub thresh: u64,

    /// Allow pruning a strong-branch child on objective value alone when
    /// the engine proves (local) optimality above the cutoff.
    pub trust_cutoff: bool,

    /// Numeric tolerance.
    pub etol: f64,
}

impl Default for BrancherSettings {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            max_strong_cands: 20,
            max_depth: 1000,
            min_node_dist: 50,
            thresh: 4,
            trust_cutoff: true,
            etol: 1e-6,
        }
    }
}

impl BrancherSettings {
    /// Set the per-solve engine iteration cap.
    pub fn with_max_iterations(mut self, k: u32) -> Self {
        self.max_iterations = k;
        self
    }

    /// Set the strong-branching candidate cap.
    pub fn with_max_strong_cands(mut self, k: usize) -> Self {
        self.max_strong_cands = k;
        self
    }

    /// Set the depth above which strong branching is skipped.
    pub fn with_max_depth(mut self, k: u32) -> Self {
        self.max_depth = k;
        self
    }

    /// Set the minimum node distance between strong-branchings of the
    /// same variable.
    pub fn with_min_node_dist(mut self, k: u64) -> Self {
        self.min_node_dist = k;
        self
    }

    /// Set the reliability observation threshold.
    pub fn with_thresh(mut self, k: u64) -> Self {
        self.thresh = k;
        self
    }

    /// Enable or disable cutoff-based pruning from proven optima.
    pub fn with_trust_cutoff(mut self, val: bool) -> Self {
        self.trust_cutoff = val;
        self
    }
}
