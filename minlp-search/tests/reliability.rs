//! End-to-end tests for the reliability brancher over a scripted engine.

use std::collections::VecDeque;
use std::rc::Rc;

use minlp_core::{Engine, EngineStatus, Relaxation, Solution, SolutionPool, VarType};
use minlp_search::{
    BranchDirection, BranchOutcome, BrancherSettings, Handler, IntVarHandler, Node, PseudoCosts,
    ReliabilityBrancher, SearchError,
};

/// Engine double that replays a script of (status, objective) pairs.
struct ScriptedEngine {
    script: VecDeque<(EngineStatus, f64)>,
    last: (EngineStatus, f64),
    solves: u64,
    iters_per_solve: u64,
    limit: Option<u32>,
    strong_mode: bool,
    enables: u32,
    disables: u32,
}

impl ScriptedEngine {
    fn new(script: Vec<(EngineStatus, f64)>) -> Self {
        Self {
            script: script.into(),
            last: (EngineStatus::EngineUnknownStatus, f64::NAN),
            solves: 0,
            iters_per_solve: 5,
            limit: None,
            strong_mode: false,
            enables: 0,
            disables: 0,
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Engine for ScriptedEngine {
    fn solve(&mut self, _rel: &Relaxation) -> EngineStatus {
        self.solves += 1;
        self.last = self
            .script
            .pop_front()
            .expect("engine solved more often than scripted");
        self.last.0
    }

    fn solution_value(&self) -> f64 {
        self.last.1
    }

    fn iteration_count(&self) -> u64 {
        self.iters_per_solve
    }

    fn set_iteration_limit(&mut self, limit: u32) {
        self.limit = Some(limit);
    }

    fn reset_iteration_limit(&mut self) {
        self.limit = None;
    }

    fn enable_strong_branching(&mut self) {
        self.strong_mode = true;
        self.enables += 1;
    }

    fn disable_strong_branching(&mut self) {
        self.strong_mode = false;
        self.disables += 1;
    }
}

/// Relaxation with `n` integer variables bounded by [0, 10].
fn int_rel(n: usize) -> Relaxation {
    let mut rel = Relaxation::new(vec![1.0; n]);
    for i in 0..n {
        rel.set_var_type(i, VarType::Integer).unwrap();
        rel.set_var_bounds(i, 0.0, 10.0).unwrap();
    }
    rel
}

fn brancher(settings: BrancherSettings) -> ReliabilityBrancher {
    let handlers: Vec<Rc<dyn Handler>> = vec![Rc::new(IntVarHandler::default())];
    ReliabilityBrancher::new(settings, handlers)
}

/// Snapshot whose merged pseudo-costs come out as `mean` with `times`
/// observations when the worker ledger is empty: the merge normalizes the
/// incoming aggregate by the total count, so the aggregate is mean*times.
fn snapshot_with(n: usize, entries: &[(usize, f64, f64, u64)]) -> PseudoCosts {
    let mut snap = PseudoCosts::new(n);
    for &(i, mean_up, mean_down, times) in entries {
        for _ in 0..times {
            snap.update(i, BranchDirection::Up, mean_up * times as f64);
            snap.update(i, BranchDirection::Down, mean_down * times as f64);
        }
    }
    snap
}

#[test]
fn s1_reliable_variable_wins() {
    let mut rel = int_rel(2);
    let mut br = brancher(BrancherSettings::default());
    let mut engine = ScriptedEngine::empty();
    let pool = SolutionPool::default();
    let node = Node::root(0);

    // Both variables reliable: 4 observations per direction, merged
    // pseudo-costs up [2, 1], down [1, 2].
    let snap = snapshot_with(2, &[(0, 2.0, 1.0, 4), (1, 1.0, 2.0, 4)]);
    let sol = Solution::new(vec![3.5, 6.5], 0.0);

    let out = br
        .find_branches(&mut rel, &node, &sol, &pool, &mut engine, snap, 0)
        .unwrap();

    // Scores tie at 0.8*0.5 + 0.2*1.0 = 0.6; first in handler order wins.
    match out {
        BranchOutcome::Branches(branches) => {
            assert_eq!(branches.len(), 2);
            let cand = branches[0].cand().unwrap();
            assert_eq!(cand.pcost_index(), Some(0));
            // Up change 1.0 dominates down change 0.5, so the weak side
            // (down) is branched first.
            assert_eq!(cand.direction(), BranchDirection::Down);
        }
        other => panic!("expected branches, got {:?}", other),
    }

    // Reliable candidates are never strong-branched.
    assert_eq!(engine.solves, 0);
    assert_eq!(br.stats().str_br_calls, 0);
    assert_eq!(br.stats().calls, 1);
}

#[test]
fn s2_strong_branch_prunes_both_sides() {
    let mut rel = int_rel(1);
    let mut br = brancher(BrancherSettings::default());
    let mut engine = ScriptedEngine::new(vec![
        (EngineStatus::ProvenInfeasible, 0.0),
        (EngineStatus::ProvenInfeasible, 0.0),
    ]);
    let pool = SolutionPool::default();
    let node = Node::root(0);
    let sol = Solution::new(vec![3.5], 10.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(1),
            0,
        )
        .unwrap();

    assert!(matches!(out, BranchOutcome::Pruned));
    assert_eq!(br.stats().bnd_change, 2);
    assert_eq!(br.stats().str_br_calls, 2);
    assert_eq!(br.stats().iters, 10);

    // Engine handshake: setup enabled and torn down, limit restored.
    assert_eq!((engine.enables, engine.disables), (1, 1));
    assert!(engine.limit.is_none());
    assert!(!engine.strong_mode);

    // Bounds restored by the undo on the pruning path.
    assert_eq!(rel.var_lb(0), 0.0);
    assert_eq!(rel.var_ub(0), 10.0);
}

#[test]
fn s3_strong_branch_prunes_one_side() {
    let mut rel = int_rel(1);
    let mut br = brancher(BrancherSettings::default());
    // Down child infeasible; up child optimal well below the cutoff.
    let mut engine = ScriptedEngine::new(vec![
        (EngineStatus::ProvenInfeasible, 0.0),
        (EngineStatus::ProvenOptimal, 12.0),
    ]);
    let mut pool = SolutionPool::default();
    pool.add(Solution::new(vec![0.0], 100.0));
    let node = Node::root(0);
    let sol = Solution::new(vec![3.5], 10.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(1),
            0,
        )
        .unwrap();

    match out {
        BranchOutcome::Modified(mods) => {
            assert_eq!(mods.len(), 1);
            // The surviving side is up: applying the modification lifts
            // the lower bound to ceil(3.5).
            mods[0].apply(&mut rel);
            assert_eq!(rel.var_lb(0), 4.0);
            assert_eq!(rel.var_ub(0), 10.0);
        }
        other => panic!("expected modifications, got {:?}", other),
    }
    assert_eq!(br.stats().bnd_change, 1);

    // A one-sided prune discards both observations.
    assert_eq!(br.pseudo_costs().times_up(0), 0);
    assert_eq!(br.pseudo_costs().times_down(0), 0);
}

#[test]
fn s4_iteration_limit_updates_pseudocosts_without_pruning() {
    let mut rel = int_rel(1);
    let mut br = brancher(BrancherSettings::default());
    let mut engine = ScriptedEngine::new(vec![
        (EngineStatus::EngineIterationLimit, 10.2),
        (EngineStatus::EngineIterationLimit, 10.3),
    ]);
    let mut pool = SolutionPool::default();
    pool.add(Solution::new(vec![0.0], 20.0));
    let node = Node::root(0);
    let sol = Solution::new(vec![3.5], 10.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(1),
            0,
        )
        .unwrap();

    // No conclusion, so the candidate is branched normally.
    match out {
        BranchOutcome::Branches(branches) => {
            let cand = branches[0].cand().unwrap();
            // Up change 0.3 > down change 0.2: down is branched first.
            assert_eq!(cand.direction(), BranchDirection::Down);
        }
        other => panic!("expected branches, got {:?}", other),
    }

    // Partial bounds still feed the ledger: 0.2/(0.5+etol), 0.3/(0.5+etol).
    let pc = br.pseudo_costs();
    assert_eq!(pc.times_down(0), 1);
    assert_eq!(pc.times_up(0), 1);
    assert!((pc.pseudo_down(0) - 0.4).abs() < 1e-4);
    assert!((pc.pseudo_up(0) - 0.6).abs() < 1e-4);
    assert_eq!(br.stats().bnd_change, 0);
}

#[test]
fn s5_depth_cap_skips_strong_branching() {
    let mut rel = int_rel(2);
    let settings = BrancherSettings::default().with_max_depth(5);
    let mut br = brancher(settings);
    let mut engine = ScriptedEngine::empty();
    let pool = SolutionPool::default();
    // Node below the depth cap.
    let node = Node::new(7, 6, None, None);
    let sol = Solution::new(vec![3.5, 2.25], 0.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(2),
            0,
        )
        .unwrap();

    // Both candidates were unreliable, yet nothing was solved; they are
    // scored from (zero) pseudo-costs instead.
    assert!(matches!(out, BranchOutcome::Branches(_)));
    assert_eq!(engine.solves, 0);
    assert_eq!(br.stats().str_br_calls, 0);
}

#[test]
fn s6_update_after_solve_feeds_down_ledger() {
    let mut br = brancher(BrancherSettings::default());

    let parent = Node::root(0);
    parent.set_lb(10.0);
    let cand = Rc::new(minlp_search::BrCand::new_var(0, 0.7, 0.3, "x0"));
    let child = Node::child(&parent, 1, cand, 3.7);
    child.set_lb(14.0);

    // Child moved x0 from 3.7 to 3.0: a down observation of
    // |14-10| / (0.7 + 1e-6) ~= 5.714.
    let sol = Solution::new(vec![3.0], 14.0);
    br.update_after_solve(&child, &sol);

    let pc = br.pseudo_costs();
    assert_eq!(pc.times_down(0), 1);
    assert_eq!(pc.times_up(0), 0);
    assert!((pc.pseudo_down(0) - 5.714).abs() < 1e-3);
}

#[test]
fn update_after_solve_is_noop_at_root() {
    let mut br = brancher(BrancherSettings::default());
    let root = Node::root(0);
    root.set_lb(3.0);
    br.update_after_solve(&root, &Solution::new(vec![1.0], 3.0));
    assert!(br.pseudo_costs().is_empty());
}

#[test]
fn untrusted_cutoff_never_prunes_on_objective() {
    let mut rel = int_rel(1);
    let settings = BrancherSettings::default().with_trust_cutoff(false);
    let mut br = brancher(settings);
    // Both children optimal far above the cutoff.
    let mut engine = ScriptedEngine::new(vec![
        (EngineStatus::ProvenOptimal, 1e9),
        (EngineStatus::ProvenOptimal, 1e9),
    ]);
    let mut pool = SolutionPool::default();
    pool.add(Solution::new(vec![0.0], 20.0));
    let node = Node::root(0);
    let sol = Solution::new(vec![3.5], 10.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(1),
            0,
        )
        .unwrap();

    assert!(matches!(out, BranchOutcome::Branches(_)));
    assert_eq!(br.stats().bnd_change, 0);
    // The huge bound changes still calibrate the ledger.
    assert_eq!(br.pseudo_costs().times_up(0), 1);
}

#[test]
fn recent_strong_branch_makes_candidate_reliable() {
    let mut rel = int_rel(1);
    let mut br = brancher(BrancherSettings::default());
    let pool = SolutionPool::default();
    let node = Node::root(0);
    let sol = Solution::new(vec![3.5], 10.0);

    // First call strong-branches the lone unreliable candidate.
    let mut engine = ScriptedEngine::new(vec![
        (EngineStatus::EngineIterationLimit, 10.2),
        (EngineStatus::EngineIterationLimit, 10.3),
    ]);
    br.find_branches(
        &mut rel,
        &node,
        &sol,
        &pool,
        &mut engine,
        PseudoCosts::new(1),
        0,
    )
    .unwrap();
    assert_eq!(engine.solves, 2);

    // Second call a node later: the recency window classifies the same
    // variable reliable, so no solve happens.
    let mut engine2 = ScriptedEngine::empty();
    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine2,
            PseudoCosts::new(1),
            1,
        )
        .unwrap();
    assert!(matches!(out, BranchOutcome::Branches(_)));
    assert_eq!(engine2.solves, 0);

    // Observation counts only ever grow.
    assert_eq!(br.pseudo_costs().times_up(0), 1);
    assert_eq!(br.pseudo_costs().times_down(0), 1);
}

#[test]
fn integral_point_yields_no_candidates() {
    let mut rel = int_rel(2);
    let mut br = brancher(BrancherSettings::default());
    let mut engine = ScriptedEngine::empty();
    let pool = SolutionPool::default();
    let node = Node::root(0);
    let sol = Solution::new(vec![3.0, 7.0], 10.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(2),
            0,
        )
        .unwrap();
    assert!(matches!(out, BranchOutcome::NoCandidates));
}

#[test]
fn infeasible_integer_domain_prunes_node() {
    let mut rel = int_rel(1);
    rel.set_var_bounds(0, 2.3, 2.7).unwrap();
    let mut br = brancher(BrancherSettings::default());
    let mut engine = ScriptedEngine::empty();
    let pool = SolutionPool::default();
    let node = Node::root(0);
    let sol = Solution::new(vec![2.5], 10.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(1),
            0,
        )
        .unwrap();
    assert!(matches!(out, BranchOutcome::Pruned));
    assert_eq!(engine.solves, 0);
}

#[test]
fn handler_modifications_come_back_before_branching() {
    let mut rel = int_rel(1);
    rel.set_var_bounds(0, 0.4, 6.8).unwrap();
    let mut br = brancher(BrancherSettings::default());
    let mut engine = ScriptedEngine::empty();
    let pool = SolutionPool::default();
    let node = Node::root(0);
    let sol = Solution::new(vec![3.5], 10.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(1),
            0,
        )
        .unwrap();

    match out {
        BranchOutcome::Modified(mods) => {
            assert_eq!(mods.len(), 1);
            mods[0].apply(&mut rel);
            assert_eq!(rel.var_lb(0), 1.0);
            assert_eq!(rel.var_ub(0), 6.0);
        }
        other => panic!("expected modifications, got {:?}", other),
    }
    assert_eq!(engine.solves, 0);
}

#[test]
fn short_snapshot_is_rejected() {
    let mut rel = int_rel(3);
    let mut br = brancher(BrancherSettings::default());
    let mut engine = ScriptedEngine::empty();
    let pool = SolutionPool::default();
    let node = Node::root(0);
    let sol = Solution::new(vec![0.5, 0.5, 0.5], 0.0);

    let err = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(1),
            0,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        SearchError::SnapshotDimension {
            expected: 3,
            actual: 1
        }
    ));
}

#[test]
fn strong_branch_cap_limits_probes() {
    let mut rel = int_rel(4);
    let settings = BrancherSettings::default().with_max_strong_cands(2);
    let mut br = brancher(settings);
    // Two probed candidates, two solves each.
    let mut engine = ScriptedEngine::new(vec![
        (EngineStatus::EngineIterationLimit, 10.1),
        (EngineStatus::EngineIterationLimit, 10.2),
        (EngineStatus::EngineIterationLimit, 10.3),
        (EngineStatus::EngineIterationLimit, 10.4),
    ]);
    let pool = SolutionPool::default();
    let node = Node::root(0);
    let sol = Solution::new(vec![3.5, 2.5, 1.5, 0.5], 10.0);

    let out = br
        .find_branches(
            &mut rel,
            &node,
            &sol,
            &pool,
            &mut engine,
            PseudoCosts::new(4),
            0,
        )
        .unwrap();
    assert!(matches!(out, BranchOutcome::Branches(_)));
    assert_eq!(engine.solves, 4);
    assert_eq!(br.stats().str_br_calls, 4);
}
