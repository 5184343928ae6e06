//! Reliability branching.
//!
//! At each open node the brancher collects candidates from the handlers,
//! splits them into reliable (trusted pseudo-costs) and unreliable, probes
//! the unreliable ones with strong branching to calibrate their
//! pseudo-costs, and emits either child branches, node modifications, or
//! a prune verdict. Strong-branch solves also give cutoff-based pruning
//! for free: a child proved infeasible or above the cutoff removes one
//! side of the disjunction.

use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use minlp_core::numerics::to_clock_time;
use minlp_core::{Engine, EngineStatus, Modification, Relaxation, Solution, SolutionPool};

use crate::error::{SearchError, SearchResult};
use crate::handler::{Branch, Handler};
use crate::settings::BrancherSettings;

use super::candidate::{compare_score, BrCand, BranchDirection};
use super::node::Node;
use super::pseudocost::PseudoCosts;

const ME: &str = "reliability brancher";

/// Sentinel for "never strong-branched"; far enough from any real node
/// count that the recency test cannot fire spuriously.
const NEVER_STR_BRANCHED: u64 = 20_000;

/// Weight of pseudo-costs in the unreliability ordering.
const SCORE_WT: f64 = 1e-5;

/// Weight of fractionality in the unreliability ordering.
const FRAC_WT: f64 = 1e-6;

/// Outcome of one `find_branches` call.
#[derive(Debug)]
pub enum BranchOutcome {
    /// Child branches for the best candidate, preferred direction first.
    Branches(Vec<Branch>),

    /// Safe tightenings; the driver applies them and re-solves the node.
    Modified(Vec<Box<dyn Modification>>),

    /// The node is infeasible or fully cut off and can be closed.
    Pruned,

    /// No handler produced a candidate; the caller decides fathoming.
    NoCandidates,
}

/// Counters and timings the brancher accumulates across calls.
#[derive(Debug, Clone, Default)]
pub struct BrancherStats {
    /// `find_branches` invocations.
    pub calls: u64,

    /// Strong-branch solves with an unusable engine status.
    pub eng_probs: u64,

    /// Strong-branch solves issued.
    pub str_br_calls: u64,

    /// Bound modifications produced from strong-branch conclusions.
    pub bnd_change: u64,

    /// Engine iterations spent in strong branching.
    pub iters: u64,

    /// Wall time spent in strong-branch solves.
    pub str_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    NotModified,
    Modified,
    Pruned,
}

/// Which candidate pool the running best lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pool {
    Reliable,
    Unreliable,
}

/// The reliability brancher.
///
/// One instance per worker. The pseudo-cost ledger inside is strictly
/// local; cross-worker state arrives only through the snapshot passed
/// into each call.
pub struct ReliabilityBrancher {
    settings: BrancherSettings,

    /// Ordered handler collection; order decides tie-breaks.
    handlers: Vec<Rc<dyn Handler>>,

    /// Worker-local pseudo-cost ledger.
    pseudo: PseudoCosts,

    /// Node stamp of the last strong branching per variable.
    last_str_branched: Vec<u64>,

    /// Copy of the primal point; strong branching works on the copy.
    x: Vec<f64>,

    rel_cands: Vec<BrCand>,
    unrel_cands: Vec<BrCand>,
    mods: Vec<Box<dyn Modification>>,
    status: Status,
    stats: BrancherStats,
}

impl ReliabilityBrancher {
    /// Create a brancher over an ordered handler collection.
    pub fn new(settings: BrancherSettings, handlers: Vec<Rc<dyn Handler>>) -> Self {
        Self {
            settings,
            handlers,
            pseudo: PseudoCosts::default(),
            last_str_branched: Vec::new(),
            x: Vec::new(),
            rel_cands: Vec::new(),
            unrel_cands: Vec::new(),
            mods: Vec::new(),
            status: Status::NotModified,
            stats: BrancherStats::default(),
        }
    }

    /// Brancher name, for logs.
    pub fn name(&self) -> &'static str {
        ME
    }

    /// Current settings.
    pub fn settings(&self) -> &BrancherSettings {
        &self.settings
    }

    /// Worker-local pseudo-cost ledger.
    pub fn pseudo_costs(&self) -> &PseudoCosts {
        &self.pseudo
    }

    /// Accumulated statistics.
    pub fn stats(&self) -> &BrancherStats {
        &self.stats
    }

    /// Decide how to split `node`.
    ///
    /// `snapshot` is a working copy of the shared pseudo-cost aggregate;
    /// the worker ledger is merged into it per candidate before
    /// classification. `nodes_processed` is the logical clock for the
    /// strong-branching recency test.
    pub fn find_branches(
        &mut self,
        rel: &mut Relaxation,
        node: &Node,
        sol: &Solution,
        pool: &SolutionPool,
        engine: &mut dyn Engine,
        mut snapshot: PseudoCosts,
        nodes_processed: u64,
    ) -> SearchResult<BranchOutcome> {
        self.stats.calls += 1;
        let n = rel.num_vars();
        self.initialize(n);
        if snapshot.len() < n {
            return Err(SearchError::SnapshotDimension {
                expected: n,
                actual: snapshot.len(),
            });
        }

        self.status = Status::NotModified;
        self.mods.clear();

        // Work on a copy: strong branching probes mutate bounds around
        // this point and handlers read it repeatedly.
        self.x.clear();
        self.x.extend_from_slice(sol.x());

        self.find_candidates(rel, &mut snapshot, nodes_processed);
        match self.status {
            Status::Pruned => {
                self.clear_candidates();
                return Ok(BranchOutcome::Pruned);
            }
            Status::Modified => {
                self.clear_candidates();
                return Ok(BranchOutcome::Modified(std::mem::take(&mut self.mods)));
            }
            Status::NotModified => {}
        }

        let best = self.find_best_candidate(
            sol.obj_value(),
            pool.best_value(),
            node,
            rel,
            engine,
            &snapshot,
            nodes_processed,
        );

        match self.status {
            Status::NotModified => match best {
                Some((which, i, dir)) => self.emit_branches(which, i, dir, rel, pool),
                None => {
                    self.clear_candidates();
                    Ok(BranchOutcome::NoCandidates)
                }
            },
            Status::Modified => {
                self.clear_candidates();
                log::debug!("{}: found modifications", ME);
                Ok(BranchOutcome::Modified(std::mem::take(&mut self.mods)))
            }
            Status::Pruned => {
                self.clear_candidates();
                log::debug!("{}: pruned", ME);
                Ok(BranchOutcome::Pruned)
            }
        }
    }

    /// Ingest the bound change observed when a child node was solved.
    ///
    /// No-op at the root and for generic candidates. The observation goes
    /// to the down ledger when the branched variable moved down, else up.
    pub fn update_after_solve(&mut self, node: &Node, sol: &Solution) {
        let parent = match node.parent() {
            Some(p) => p,
            None => return,
        };
        let rec = match node.branch() {
            Some(r) => r,
            None => return,
        };
        let index = match rec.cand.pcost_index() {
            Some(i) => i,
            None => return,
        };

        self.pseudo.ensure_len(index + 1);
        let oldval = rec.activity;
        let newval = sol.x()[index];
        // The ledger clamps negative, NaN and infinite costs to zero.
        let cost = (node.lb() - parent.lb()) / ((newval - oldval).abs() + self.settings.etol);
        if newval < oldval {
            self.pseudo.update(index, BranchDirection::Down, cost);
        } else {
            self.pseudo.update(index, BranchDirection::Up, cost);
        }
    }

    /// Write the statistics block.
    pub fn write_stats<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}: times called                = {}", ME, self.stats.calls)?;
        writeln!(out, "{}: no. of problems in engine   = {}", ME, self.stats.eng_probs)?;
        writeln!(out, "{}: times relaxation solved     = {}", ME, self.stats.str_br_calls)?;
        writeln!(out, "{}: times bounds changed        = {}", ME, self.stats.bnd_change)?;
        writeln!(out, "{}: iterations in relaxations   = {}", ME, self.stats.iters)?;
        writeln!(
            out,
            "{}: time in solving relaxations = {}",
            ME,
            to_clock_time(self.stats.str_time.as_secs_f64())
        )
    }

    fn initialize(&mut self, n: usize) {
        self.pseudo.ensure_len(n);
        if self.last_str_branched.len() < n {
            self.last_str_branched.resize(n, NEVER_STR_BRANCHED);
        }
        self.x.reserve(n);
        self.rel_cands.reserve(n);
        self.unrel_cands.reserve(n);
    }

    /// Ask every handler for candidates and classify them against the
    /// merged snapshot. Short-circuits to `Pruned`/`Modified` if a
    /// handler settles the node without branching.
    fn find_candidates(
        &mut self,
        rel: &Relaxation,
        snapshot: &mut PseudoCosts,
        nodes_processed: u64,
    ) {
        let mut var_cands: Vec<BrCand> = Vec::new();
        let mut gen_cands: Vec<BrCand> = Vec::new();
        let mut seen = vec![false; rel.num_vars()];

        for h in &self.handlers {
            let mut coll = h.branching_candidates(rel, &self.x);
            for c in coll.var_cands.iter_mut().chain(coll.gen_cands.iter_mut()) {
                c.set_handler(Rc::clone(h));
            }
            if coll.infeasible {
                self.status = Status::Pruned;
                return;
            }
            if !coll.mods.is_empty() {
                self.mods.append(&mut coll.mods);
                self.status = Status::Modified;
                return;
            }
            for c in coll.var_cands {
                match c.pcost_index() {
                    Some(i) if !seen[i] => {
                        seen[i] = true;
                        var_cands.push(c);
                    }
                    _ => {}
                }
            }
            gen_cands.append(&mut coll.gen_cands);
        }

        for mut c in var_cands {
            let index = c
                .pcost_index()
                .expect("variable candidate without an index");
            snapshot.merge_at(&self.pseudo, index);

            let recently_probed = nodes_processed.abs_diff(self.last_str_branched[index])
                < self.settings.min_node_dist;
            let enough_observed = snapshot.times_up(index) >= self.settings.thresh
                && snapshot.times_down(index) >= self.settings.thresh;
            if recently_probed || enough_observed {
                self.rel_cands.push(c);
            } else {
                let score = (snapshot.times_up(index) + snapshot.times_down(index)) as f64
                    - SCORE_WT * (snapshot.pseudo_up(index) + snapshot.pseudo_down(index))
                    - FRAC_WT * c.d_dist().max(c.u_dist());
                c.set_score(score);
                self.unrel_cands.push(c);
            }
        }

        // Generic candidates carry their own score and are never
        // strong-branched.
        self.rel_cands.extend(gen_cands);

        self.unrel_cands.sort_by(compare_score);

        log::debug!(
            "{}: {} reliable, {} unreliable candidates",
            ME,
            self.rel_cands.len(),
            self.unrel_cands.len()
        );
    }

    /// Score reliable candidates from pseudo-costs, strong-branch the
    /// unreliable ones, and return the best (pool, position, direction).
    #[allow(clippy::too_many_arguments)]
    fn find_best_candidate(
        &mut self,
        objval: f64,
        cutoff: f64,
        node: &Node,
        rel: &mut Relaxation,
        engine: &mut dyn Engine,
        snapshot: &PseudoCosts,
        nodes_processed: u64,
    ) -> Option<(Pool, usize, BranchDirection)> {
        let mut best: Option<(Pool, usize, BranchDirection)> = None;
        let mut best_score = f64::NEG_INFINITY;

        for i in 0..self.rel_cands.len() {
            let (ch_down, ch_up, score) = Self::pc_score(&self.rel_cands[i], snapshot);
            if score > best_score {
                best_score = score;
                best = Some((Pool::Reliable, i, Self::direction_for(ch_up, ch_down)));
            }
        }

        if self.unrel_cands.is_empty() {
            return best;
        }

        let chcutoff = cutoff - objval;
        engine.enable_strong_branching();
        engine.set_iteration_limit(self.settings.max_iterations);

        let maxcnt = if node.depth() > self.settings.max_depth {
            0
        } else {
            self.settings.max_strong_cands
        };

        let mut visited = 0;
        while visited < maxcnt && visited < self.unrel_cands.len() {
            let i = visited;
            visited += 1;

            let (obj_down, obj_up, status_down, status_up) = Self::strong_branch(
                &self.unrel_cands[i],
                &self.x,
                rel,
                engine,
                &mut self.stats,
            );
            let change_up = (obj_up - objval).max(0.0);
            let change_down = (obj_down - objval).max(0.0);
            let (change_up, change_down) = self.use_strong_branch_info(
                i,
                chcutoff,
                change_up,
                change_down,
                status_up,
                status_down,
                rel,
            );
            let score = Self::bi_score(change_up, change_down);

            let index = self.unrel_cands[i]
                .pcost_index()
                .expect("strong-branched candidate without an index");
            self.last_str_branched[index] = nodes_processed + 1;

            if self.status != Status::NotModified {
                break;
            }
            if score > best_score {
                best_score = score;
                best = Some((
                    Pool::Unreliable,
                    i,
                    Self::direction_for(change_up, change_down),
                ));
            }
        }
        engine.reset_iteration_limit();
        engine.disable_strong_branching();

        if self.status == Status::NotModified {
            // Score candidates the cap left unprobed with pseudo-costs.
            for i in visited..self.unrel_cands.len() {
                let (ch_down, ch_up, score) = Self::pc_score(&self.unrel_cands[i], snapshot);
                if score > best_score {
                    best_score = score;
                    best = Some((Pool::Unreliable, i, Self::direction_for(ch_up, ch_down)));
                }
            }
        }
        best
    }

    /// Solve both children of a candidate: apply the down modification,
    /// solve, undo, then the same for up.
    fn strong_branch(
        cand: &BrCand,
        x: &[f64],
        rel: &mut Relaxation,
        engine: &mut dyn Engine,
        stats: &mut BrancherStats,
    ) -> (f64, f64, EngineStatus, EngineStatus) {
        let h = Rc::clone(cand.handler().expect("handler stamped at collection"));

        let m = h.branch_mod(cand, x, rel, BranchDirection::Down);
        m.apply(rel);
        let t = Instant::now();
        let status_down = engine.solve(rel);
        stats.str_time += t.elapsed();
        stats.str_br_calls += 1;
        stats.iters += engine.iteration_count();
        let obj_down = engine.solution_value();
        m.undo(rel);

        let m = h.branch_mod(cand, x, rel, BranchDirection::Up);
        m.apply(rel);
        let t = Instant::now();
        let status_up = engine.solve(rel);
        stats.str_time += t.elapsed();
        stats.str_br_calls += 1;
        stats.iters += engine.iteration_count();
        let obj_up = engine.solution_value();
        m.undo(rel);

        (obj_down, obj_up, status_down, status_up)
    }

    /// Turn one strong-branch probe into a conclusion: prune the node,
    /// emit a one-sided modification, or feed the pseudo-cost ledger.
    ///
    /// Returns the (possibly zeroed) changes to score the candidate with.
    #[allow(clippy::too_many_arguments)]
    fn use_strong_branch_info(
        &mut self,
        i: usize,
        chcutoff: f64,
        change_up: f64,
        change_down: f64,
        status_up: EngineStatus,
        status_down: EngineStatus,
        rel: &Relaxation,
    ) -> (f64, f64) {
        let mut is_rel = true;
        let prune_down = self.should_prune(chcutoff, change_down, status_down, &mut is_rel);
        let prune_up = self.should_prune(chcutoff, change_up, status_up, &mut is_rel);

        if !is_rel {
            // Observation unusable; keep searching without it.
            return (0.0, 0.0);
        }

        if prune_up && prune_down {
            self.status = Status::Pruned;
            self.stats.bnd_change += 2;
        } else if prune_up || prune_down {
            let keep = if prune_up {
                BranchDirection::Down
            } else {
                BranchDirection::Up
            };
            let m = {
                let cand = &self.unrel_cands[i];
                let h = Rc::clone(cand.handler().expect("handler stamped at collection"));
                h.branch_mod(cand, &self.x, rel, keep)
            };
            self.mods.push(m);
            self.status = Status::Modified;
            self.stats.bnd_change += 1;
        } else {
            let (index, d_dist, u_dist) = {
                let cand = &self.unrel_cands[i];
                (
                    cand.pcost_index()
                        .expect("strong-branched candidate without an index"),
                    cand.d_dist(),
                    cand.u_dist(),
                )
            };
            let etol = self.settings.etol;
            self.pseudo.update(
                index,
                BranchDirection::Down,
                change_down.abs() / (d_dist.abs() + etol),
            );
            self.pseudo.update(
                index,
                BranchDirection::Up,
                change_up.abs() / (u_dist.abs() + etol),
            );
        }
        (change_up, change_down)
    }

    /// Interpret one child's engine status.
    fn should_prune(
        &mut self,
        chcutoff: f64,
        change: f64,
        status: EngineStatus,
        is_rel: &mut bool,
    ) -> bool {
        match status {
            EngineStatus::ProvenLocalInfeasible
            | EngineStatus::ProvenInfeasible
            | EngineStatus::ProvenObjectiveCutOff => true,
            EngineStatus::ProvenLocalOptimal | EngineStatus::ProvenOptimal => {
                self.settings.trust_cutoff && change > chcutoff - self.settings.etol
            }
            EngineStatus::EngineIterationLimit => false,
            EngineStatus::ProvenFailedCqFeas | EngineStatus::ProvenFailedCqInfeas => {
                log::info!("{}: failed CQ, continuing", ME);
                *is_rel = false;
                false
            }
            EngineStatus::ProvenUnbounded
            | EngineStatus::EngineError
            | EngineStatus::EngineUnknownStatus => {
                log::warn!("{}: unexpected engine status {:?}", ME, status);
                *is_rel = false;
                self.stats.eng_probs += 1;
                false
            }
        }
    }

    /// Extract the winner, ask its handler for branches, and tag them.
    fn emit_branches(
        &mut self,
        which: Pool,
        i: usize,
        dir: BranchDirection,
        rel: &Relaxation,
        pool: &SolutionPool,
    ) -> SearchResult<BranchOutcome> {
        let mut cand = match which {
            Pool::Reliable => self.rel_cands.swap_remove(i),
            Pool::Unreliable => self.unrel_cands.swap_remove(i),
        };
        cand.set_direction(dir);

        let h = Rc::clone(cand.handler().expect("handler stamped at collection"));
        let cand = Rc::new(cand);
        let mut branches = h.branches(&cand, &self.x, rel, pool);
        self.clear_candidates();

        if branches.is_empty() {
            return Err(SearchError::EmptyBranches {
                handler: h.name().to_string(),
                cand: cand.name().to_string(),
            });
        }
        for b in &mut branches {
            b.set_cand(Rc::clone(&cand));
        }
        log::debug!("{}: best candidate = {}", ME, cand.name());
        Ok(BranchOutcome::Branches(branches))
    }

    fn clear_candidates(&mut self) {
        self.rel_cands.clear();
        self.unrel_cands.clear();
    }

    /// Pseudo-cost score of a candidate against the merged snapshot.
    /// Returns (down change, up change, score).
    fn pc_score(cand: &BrCand, snapshot: &PseudoCosts) -> (f64, f64, f64) {
        match cand.pcost_index() {
            Some(i) => {
                let ch_down = cand.d_dist() * snapshot.pseudo_down(i);
                let ch_up = cand.u_dist() * snapshot.pseudo_up(i);
                (ch_down, ch_up, Self::bi_score(ch_up, ch_down))
            }
            None => (0.0, 0.0, cand.score()),
        }
    }

    /// Weighted two-sided score: the weaker side dominates.
    fn bi_score(up_score: f64, down_score: f64) -> f64 {
        if up_score > down_score {
            down_score * 0.8 + up_score * 0.2
        } else {
            up_score * 0.8 + down_score * 0.2
        }
    }

    /// Branch the less promising side first.
    fn direction_for(change_up: f64, change_down: f64) -> BranchDirection {
        if change_up > change_down {
            BranchDirection::Down
        } else {
            BranchDirection::Up
        }
    }
}
