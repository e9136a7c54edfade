//! Numeric problem interface.
//!
//! Model objects write into a problem through [`Problem`] only, so the same
//! compiled objects can be projected onto any backend. Variables and
//! constraints are addressed as blocks: an [`Id`] plus a period index.
//!
//! Right-hand sides are kept as named contributions (`set_rhs_term`) and
//! summed per row, which lets several objects (demand, supply, exogenous
//! terms) write into the same balance row without coordinating.

use thiserror::Error;

use crate::identity::Id;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("unknown variable block {0}")]
    UnknownVariable(Id),

    #[error("unknown constraint block {0}")]
    UnknownConstraint(Id),

    #[error("block {0} is already declared")]
    DuplicateBlock(Id),

    #[error("index {index} out of range for {id} with {len} entries")]
    OutOfRange { id: Id, index: usize, len: usize },

    #[error("problem has not been solved")]
    NotSolved,

    #[error("solver failed: {0}")]
    Solver(String),
}

pub type ProblemResult<T> = Result<T, ProblemError>;

/// Constraint sense of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    Eq,
    Le,
    Ge,
}

pub trait Problem {
    fn add_var(&mut self, id: &Id, n: usize) -> ProblemResult<()>;

    fn add_eq(&mut self, id: &Id, n: usize) -> ProblemResult<()>;

    fn add_le(&mut self, id: &Id, n: usize) -> ProblemResult<()>;

    fn add_ge(&mut self, id: &Id, n: usize) -> ProblemResult<()>;

    fn has_var(&self, id: &Id) -> bool;

    fn has_con(&self, id: &Id) -> bool;

    /// Coefficient of variable `var[vi]` in row `con[ci]`.
    fn set_con_coeff(&mut self, con: &Id, var: &Id, ci: usize, vi: usize, value: f64)
        -> ProblemResult<()>;

    fn get_con_coeff(&self, con: &Id, var: &Id, ci: usize, vi: usize) -> ProblemResult<f64>;

    /// Named right-hand-side contribution `term` to row `con[ci]`.
    fn set_rhs_term(&mut self, con: &Id, term: &Id, ci: usize, value: f64) -> ProblemResult<()>;

    fn get_rhs_term(&self, con: &Id, term: &Id, ci: usize) -> ProblemResult<f64>;

    fn set_ub(&mut self, var: &Id, i: usize, value: f64) -> ProblemResult<()>;

    fn get_ub(&self, var: &Id, i: usize) -> ProblemResult<f64>;

    fn set_lb(&mut self, var: &Id, i: usize, value: f64) -> ProblemResult<()>;

    fn get_lb(&self, var: &Id, i: usize) -> ProblemResult<f64>;

    fn set_obj_coeff(&mut self, var: &Id, i: usize, value: f64) -> ProblemResult<()>;

    fn get_obj_coeff(&self, var: &Id, i: usize) -> ProblemResult<f64>;

    /// Fix `var[i]` to `value`, overriding its bounds until [`Problem::unfix`].
    fn fix(&mut self, var: &Id, i: usize, value: f64) -> ProblemResult<()>;

    fn unfix(&mut self, var: &Id, i: usize) -> ProblemResult<()>;

    /// Marginal value of the fixing constraint on `var[i]`.
    fn fixed_var_dual(&self, var: &Id, i: usize) -> ProblemResult<f64>;

    fn solve(&mut self) -> ProblemResult<()>;

    fn var_value(&self, var: &Id, i: usize) -> ProblemResult<f64>;

    fn con_dual(&self, con: &Id, i: usize) -> ProblemResult<f64>;

    fn objective_value(&self) -> ProblemResult<f64>;

    fn warm_start(&self) -> bool;

    fn set_warm_start(&mut self, enabled: bool);

    fn set_silent(&mut self, silent: bool);
}
