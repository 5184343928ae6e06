//! Core layer of the minlp branch-and-bound framework.
//!
//! This crate holds everything the search layer consumes through typed
//! interfaces:
//!
//! - **Relaxation model**: the node-local problem a relaxation engine
//!   solves and branching modifications mutate ([`Relaxation`]).
//! - **Engine abstraction**: the [`Engine`] trait and [`EngineStatus`]
//!   codes reported back to the search.
//! - **Solutions**: [`Solution`] and the incumbent [`SolutionPool`] whose
//!   best value acts as the cutoff for pruning.
//! - **Modifications**: scoped bound changes with apply/undo semantics
//!   ([`Modification`], [`VarBoundMod`]).
//! - **Interval arithmetic** and shared numeric utilities used by bound
//!   tightening and the search heuristics.
//!
//! No concrete relaxation engine ships with this crate; implementations
//! plug in behind the [`Engine`] trait.

#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod interval;
pub mod modification;
pub mod numerics;
pub mod relaxation;
pub mod solution;

pub use engine::{Engine, EngineStatus};
pub use error::{CoreError, CoreResult};
pub use modification::{Modification, VarBoundMod};
pub use relaxation::{Relaxation, SparseCsc, VarType};
pub use solution::{Solution, SolutionPool};
