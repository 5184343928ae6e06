//! Relaxation problem representation.
//!
//! A [`Relaxation`] is the node-local problem a relaxation engine solves:
//! a linear objective, an optional sparse linear constraint block, and
//! per-variable bounds and integrality marks. Branching modifications
//! mutate the bounds; everything else is fixed for the lifetime of a node.

use crate::error::{CoreError, CoreResult};

/// Sparse matrix in CSC format.
pub type SparseCsc = sprs::CsMatI<f64, usize>;

/// Variable type for mixed-integer problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// Continuous variable.
    Continuous,

    /// Integer variable.
    Integer,

    /// Binary variable (0 or 1).
    Binary,
}

impl VarType {
    /// Returns true for integer and binary variables.
    pub fn is_integer(&self) -> bool {
        matches!(self, VarType::Integer | VarType::Binary)
    }
}

/// Node-local relaxation of a mixed-integer problem.
///
/// ```text
/// minimize    q^T x
/// subject to  A x <= b        (optional linear block)
///             lb <= x <= ub
/// ```
///
/// Integrality marks are advisory: the relaxation itself is continuous,
/// and handlers use the marks to produce branching candidates.
#[derive(Debug, Clone)]
pub struct Relaxation {
    /// Linear cost vector q (length n).
    q: Vec<f64>,

    /// Constraint matrix A (m x n, CSC). None for box-only problems.
    a: Option<SparseCsc>,

    /// Constraint right-hand side b (length m).
    b: Vec<f64>,

    /// Per-variable lower bounds (-inf allowed).
    lb: Vec<f64>,

    /// Per-variable upper bounds (+inf allowed).
    ub: Vec<f64>,

    /// Per-variable types.
    vtypes: Vec<VarType>,
}

impl Relaxation {
    /// Create a box-constrained relaxation with free continuous variables.
    pub fn new(q: Vec<f64>) -> Self {
        let n = q.len();
        Self {
            q,
            a: None,
            b: Vec::new(),
            lb: vec![f64::NEG_INFINITY; n],
            ub: vec![f64::INFINITY; n],
            vtypes: vec![VarType::Continuous; n],
        }
    }

    /// Attach a linear constraint block A x <= b.
    pub fn with_constraints(mut self, a: SparseCsc, b: Vec<f64>) -> CoreResult<Self> {
        if a.cols() != self.q.len() {
            return Err(CoreError::InvalidProblem(format!(
                "constraint matrix has {} columns, objective has {} entries",
                a.cols(),
                self.q.len()
            )));
        }
        if a.rows() != b.len() {
            return Err(CoreError::InvalidProblem(format!(
                "constraint matrix has {} rows, rhs has {} entries",
                a.rows(),
                b.len()
            )));
        }
        self.a = Some(a);
        self.b = b;
        Ok(self)
    }

    /// Number of variables.
    pub fn num_vars(&self) -> usize {
        self.q.len()
    }

    /// Number of linear constraints.
    pub fn num_cons(&self) -> usize {
        self.b.len()
    }

    /// Linear objective coefficients.
    pub fn objective(&self) -> &[f64] {
        &self.q
    }

    /// Constraint matrix, if any.
    pub fn constraints(&self) -> Option<(&SparseCsc, &[f64])> {
        self.a.as_ref().map(|a| (a, self.b.as_slice()))
    }

    /// Lower bound of variable `i`.
    pub fn var_lb(&self, i: usize) -> f64 {
        self.lb[i]
    }

    /// Upper bound of variable `i`.
    pub fn var_ub(&self, i: usize) -> f64 {
        self.ub[i]
    }

    /// Type of variable `i`.
    pub fn var_type(&self, i: usize) -> VarType {
        self.vtypes[i]
    }

    /// All lower bounds.
    pub fn lower_bounds(&self) -> &[f64] {
        &self.lb
    }

    /// All upper bounds.
    pub fn upper_bounds(&self) -> &[f64] {
        &self.ub
    }

    /// Mark variable `i` as integer, binary or continuous.
    ///
    /// Binary variables get their bounds clipped to [0, 1].
    pub fn set_var_type(&mut self, i: usize, vtype: VarType) -> CoreResult<()> {
        self.check_index(i)?;
        self.vtypes[i] = vtype;
        if vtype == VarType::Binary {
            self.lb[i] = self.lb[i].max(0.0);
            self.ub[i] = self.ub[i].min(1.0);
        }
        Ok(())
    }

    /// Set both bounds of variable `i`.
    ///
    /// NaN bounds are rejected; an empty domain (lb > ub) is allowed, since
    /// branching can legitimately create one and handlers detect it.
    pub fn set_var_bounds(&mut self, i: usize, lb: f64, ub: f64) -> CoreResult<()> {
        self.check_index(i)?;
        if lb.is_nan() || ub.is_nan() {
            return Err(CoreError::BadBounds { index: i, lb, ub });
        }
        self.lb[i] = lb;
        self.ub[i] = ub;
        Ok(())
    }

    fn check_index(&self, i: usize) -> CoreResult<()> {
        if i >= self.num_vars() {
            return Err(CoreError::BadVarIndex {
                index: i,
                num_vars: self.num_vars(),
            });
        }
        Ok(())
    }
}
