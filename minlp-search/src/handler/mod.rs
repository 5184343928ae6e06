//! Handler protocol: producing branching candidates and branches.
//!
//! Handlers know one class of constraint (integrality, SOS, a nonlinear
//! structure) and expose three capabilities: surface branching candidates
//! for a primal point, build a single-direction modification for strong
//! branching, and build the final child branches for the winner. The
//! brancher keeps handlers in an ordered collection; registration order
//! decides tie-breaks, so it is part of the contract.

mod intvar;

pub use intvar::IntVarHandler;

use std::rc::Rc;

use minlp_core::{Modification, Relaxation, SolutionPool};

use crate::search::{BrCand, BranchDirection};

/// Everything a handler reports for one node.
#[derive(Default)]
pub struct CandidateCollection {
    /// Variable candidates (tracked in the pseudo-cost ledger).
    pub var_cands: Vec<BrCand>,

    /// Generic candidates scored by the handler itself.
    pub gen_cands: Vec<BrCand>,

    /// Safe tightenings that apply to the node without branching.
    pub mods: Vec<Box<dyn Modification>>,

    /// Set when the handler proves the node infeasible.
    pub infeasible: bool,
}

impl CandidateCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }
}

/// One child of a branching, as built by a handler.
#[derive(Debug)]
pub struct Branch {
    mods: Vec<Box<dyn Modification>>,

    /// Candidate this branch came from; tagged by the brancher on the
    /// winning candidate's branches.
    cand: Option<Rc<BrCand>>,

    /// Primal value of the branched entity at the parent solve.
    activity: f64,
}

impl Branch {
    /// Create an empty branch recording the parent activity.
    pub fn new(activity: f64) -> Self {
        Self {
            mods: Vec::new(),
            cand: None,
            activity,
        }
    }

    /// Add a modification to this branch.
    pub fn push_mod(&mut self, m: Box<dyn Modification>) {
        self.mods.push(m);
    }

    /// Modifications defining the child.
    pub fn mods(&self) -> &[Box<dyn Modification>] {
        &self.mods
    }

    /// Apply all modifications to a relaxation.
    pub fn apply(&self, rel: &mut Relaxation) {
        for m in &self.mods {
            m.apply(rel);
        }
    }

    /// Undo all modifications, in reverse order.
    pub fn undo(&self, rel: &mut Relaxation) {
        for m in self.mods.iter().rev() {
            m.undo(rel);
        }
    }

    /// Originating candidate.
    pub fn cand(&self) -> Option<&Rc<BrCand>> {
        self.cand.as_ref()
    }

    /// Tag the originating candidate.
    pub fn set_cand(&mut self, cand: Rc<BrCand>) {
        self.cand = Some(cand);
    }

    /// Primal value of the branched entity at the parent solve.
    pub fn activity(&self) -> f64 {
        self.activity
    }
}

/// A producer of branching candidates and branches.
pub trait Handler {
    /// Short name, for logs and stats.
    fn name(&self) -> &str;

    /// Examine the primal point and report candidates, safe tightenings
    /// or infeasibility.
    fn branching_candidates(&self, rel: &Relaxation, x: &[f64]) -> CandidateCollection;

    /// Build the single-direction modification strong branching probes
    /// with.
    fn branch_mod(
        &self,
        cand: &BrCand,
        x: &[f64],
        rel: &Relaxation,
        dir: BranchDirection,
    ) -> Box<dyn Modification>;

    /// Build the child branches for the winning candidate, preferred
    /// direction first.
    fn branches(
        &self,
        cand: &Rc<BrCand>,
        x: &[f64],
        rel: &Relaxation,
        pool: &SolutionPool,
    ) -> Vec<Branch>;
}
