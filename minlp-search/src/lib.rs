//! Branch-and-bound search layer of the minlp framework.
//!
//! This crate decides *where to split* an open node. The driver hands the
//! reliability brancher the current relaxation, node, primal point,
//! solution pool and a pseudo-cost snapshot; handlers turn the primal
//! point into branching candidates; the brancher classifies candidates by
//! pseudo-cost reliability, probes the unreliable ones with strong
//! branching, and returns either child branches, safe node modifications,
//! or a prune verdict.
//!
//! Per-node flow:
//!
//! ```text
//! driver --(rel, node, sol, pool, snapshot)--> ReliabilityBrancher
//!   brancher -> handlers: branching_candidates
//!   brancher: classify against pseudo-cost ledger
//!   brancher -> engine: strong-branch unreliable candidates
//!   brancher -> driver: Branches | Modified | Pruned | NoCandidates
//! ```
//!
//! Workers run independent trees: every type here is single-worker state,
//! and cross-worker pseudo-cost exchange happens only through the snapshot
//! the driver passes by value into each call.

#![warn(missing_docs)]

pub mod error;
pub mod handler;
pub mod search;
pub mod settings;

pub use error::{SearchError, SearchResult};
pub use handler::{Branch, CandidateCollection, Handler, IntVarHandler};
pub use search::{
    compare_score, BrCand, BranchDirection, BranchOutcome, BranchRecord, BrancherStats, CandKind,
    Node, NodeStack, PseudoCosts, ReliabilityBrancher,
};
pub use settings::BrancherSettings;
