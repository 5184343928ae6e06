//! Pseudo-cost ledger.
//!
//! Per-variable running means of the per-unit objective change observed
//! when branching up or down, with observation counts. Each worker owns a
//! ledger; the driver merges worker ledgers into a shared snapshot between
//! calls and hands a working copy back into each `find_branches`.

use super::candidate::BranchDirection;

/// Running pseudo-cost averages and observation counts, per variable and
/// direction.
#[derive(Debug, Clone, Default)]
pub struct PseudoCosts {
    pseudo_up: Vec<f64>,
    pseudo_down: Vec<f64>,
    times_up: Vec<u64>,
    times_down: Vec<u64>,
}

impl PseudoCosts {
    /// Create a zeroed ledger for `n` variables.
    pub fn new(n: usize) -> Self {
        Self {
            pseudo_up: vec![0.0; n],
            pseudo_down: vec![0.0; n],
            times_up: vec![0; n],
            times_down: vec![0; n],
        }
    }

    /// Number of variables covered.
    pub fn len(&self) -> usize {
        self.pseudo_up.len()
    }

    /// True when the ledger covers no variables.
    pub fn is_empty(&self) -> bool {
        self.pseudo_up.is_empty()
    }

    /// Grow the ledger to cover at least `n` variables.
    pub fn ensure_len(&mut self, n: usize) {
        if n > self.len() {
            self.pseudo_up.resize(n, 0.0);
            self.pseudo_down.resize(n, 0.0);
            self.times_up.resize(n, 0);
            self.times_down.resize(n, 0);
        }
    }

    /// Up pseudo-cost of variable `i`.
    pub fn pseudo_up(&self, i: usize) -> f64 {
        self.pseudo_up[i]
    }

    /// Down pseudo-cost of variable `i`.
    pub fn pseudo_down(&self, i: usize) -> f64 {
        self.pseudo_down[i]
    }

    /// Up observation count of variable `i`.
    pub fn times_up(&self, i: usize) -> u64 {
        self.times_up[i]
    }

    /// Down observation count of variable `i`.
    pub fn times_down(&self, i: usize) -> u64 {
        self.times_down[i]
    }

    /// Ingest one observation of per-unit objective change at variable
    /// `i` in `dir`.
    ///
    /// Negative, NaN and infinite observations count as 0, so the stored
    /// means stay finite and nonnegative.
    pub fn update(&mut self, i: usize, dir: BranchDirection, new_cost: f64) {
        let cost = if new_cost.is_finite() && new_cost >= 0.0 {
            new_cost
        } else {
            0.0
        };
        let (mean, count) = match dir {
            BranchDirection::Up => (&mut self.pseudo_up[i], &mut self.times_up[i]),
            BranchDirection::Down => (&mut self.pseudo_down[i], &mut self.times_down[i]),
        };
        *mean = (*mean * *count as f64 + cost) / (*count + 1) as f64;
        *count += 1;
    }

    /// Merge a worker ledger into this snapshot at variable `i`.
    ///
    /// Counts add; the merged mean weights the worker mean by its count.
    /// The formula is commutative over workers as long as each worker's
    /// observations enter exactly once per call.
    pub fn merge_at(&mut self, local: &PseudoCosts, i: usize) {
        self.times_up[i] += local.times_up[i];
        if self.times_up[i] > 0 {
            self.pseudo_up[i] = (self.pseudo_up[i]
                + local.pseudo_up[i] * local.times_up[i] as f64)
                / self.times_up[i] as f64;
        }
        self.times_down[i] += local.times_down[i];
        if self.times_down[i] > 0 {
            self.pseudo_down[i] = (self.pseudo_down[i]
                + local.pseudo_down[i] * local.times_down[i] as f64)
                / self.times_down[i] as f64;
        }
    }
}
