//! Integrality handler.

use std::rc::Rc;

use minlp_core::numerics::is_int;
use minlp_core::{Modification, Relaxation, SolutionPool, VarBoundMod};

use super::{Branch, CandidateCollection, Handler};
use crate::search::{BrCand, BranchDirection};

/// Handler for integer and binary variables.
///
/// Produces one variable candidate per fractional integer variable,
/// detects integer domains that contain no integer point, and rounds
/// fractional bounds inward as node modifications.
pub struct IntVarHandler {
    /// A value within `etol` of an integer counts as integral.
    etol: f64,
}

impl Default for IntVarHandler {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl IntVarHandler {
    /// Create a handler with the given integrality tolerance.
    pub fn new(etol: f64) -> Self {
        Self { etol }
    }

    fn var_index(cand: &BrCand) -> usize {
        cand.pcost_index()
            .expect("integer handler asked about a generic candidate")
    }
}

impl Handler for IntVarHandler {
    fn name(&self) -> &str {
        "intvar handler"
    }

    fn branching_candidates(&self, rel: &Relaxation, x: &[f64]) -> CandidateCollection {
        let mut coll = CandidateCollection::new();

        for i in 0..rel.num_vars() {
            if !rel.var_type(i).is_integer() {
                continue;
            }
            let lb = rel.var_lb(i);
            let ub = rel.var_ub(i);

            // Integer points remaining in the domain after rounding
            // fractional bounds inward.
            let ilb = (lb - self.etol).ceil();
            let iub = (ub + self.etol).floor();
            if ilb > iub + 0.5 {
                coll.infeasible = true;
                return coll;
            }

            // Round a fractional bound to its nearest interior integer.
            let lb_frac = lb.is_finite() && !is_int(lb, self.etol);
            let ub_frac = ub.is_finite() && !is_int(ub, self.etol);
            if lb_frac || ub_frac {
                let new_lb = if lb_frac { ilb } else { lb };
                let new_ub = if ub_frac { iub } else { ub };
                coll.mods
                    .push(Box::new(VarBoundMod::new(rel, i, new_lb, new_ub)));
            }

            let v = x[i];
            if is_int(v, self.etol) {
                continue;
            }
            coll.var_cands.push(BrCand::new_var(
                i,
                v - v.floor(),
                v.ceil() - v,
                format!("x{}", i),
            ));
        }
        coll
    }

    fn branch_mod(
        &self,
        cand: &BrCand,
        x: &[f64],
        rel: &Relaxation,
        dir: BranchDirection,
    ) -> Box<dyn Modification> {
        let i = Self::var_index(cand);
        let v = x[i];
        match dir {
            BranchDirection::Down => {
                Box::new(VarBoundMod::new(rel, i, rel.var_lb(i), v.floor()))
            }
            BranchDirection::Up => Box::new(VarBoundMod::new(rel, i, v.ceil(), rel.var_ub(i))),
        }
    }

    fn branches(
        &self,
        cand: &Rc<BrCand>,
        x: &[f64],
        rel: &Relaxation,
        _pool: &SolutionPool,
    ) -> Vec<Branch> {
        let i = Self::var_index(cand);
        let v = x[i];

        let mut down = Branch::new(v);
        down.push_mod(self.branch_mod(cand, x, rel, BranchDirection::Down));

        let mut up = Branch::new(v);
        up.push_mod(self.branch_mod(cand, x, rel, BranchDirection::Up));

        match cand.direction() {
            BranchDirection::Down => vec![down, up],
            BranchDirection::Up => vec![up, down],
        }
    }
}
