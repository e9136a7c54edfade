//! # enmod-algo: built-in energy-market objects and the LP backend
//!
//! This crate fills the engine in `enmod-core` with a concrete element
//! catalogue and a numeric problem to project it onto.
//!
//! ## Catalogue
//!
//! [`default_registry`] registers a handler for every built-in
//! `(concept, type)` pair:
//!
//! | Concept | Types | Result |
//! |---------|-------|--------|
//! | TimeVector | ConstantTimeVector, InfiniteTimeVector, RotatingTimeVector | time vector |
//! | Horizon | SequentialHorizon | low-level horizon |
//! | Param | ConstantParam, MeanSeriesParam, MWToGWhSeriesParam | low-level param |
//! | Commodity, Loss | BaseCommodity, SimpleLoss | low-level extension |
//! | Conversion, Price | BaseConversion, BasePrice | low-level param |
//! | Balance | BaseBalance, ExogenBalance | [`objects::Balance`] |
//! | Flow, Storage | BaseFlow, BaseStorage | [`objects::Flow`], [`objects::Storage`] |
//! | Arrow, Capacity, Cost, RHSTerm, BoundaryCondition | ... | attached to an object |
//!
//! It also registers [`checks::unconnected_balances`], which warns about
//! balances no flow points at.
//!
//! ## Problem backend
//!
//! [`LpProblem`] keeps the problem in memory and solves it with Clarabel's
//! interior-point method, reporting primal values and duals.
//!
//! ## Example
//!
//! ```ignore
//! use enmod_algo::{default_registry, LpProblem};
//! use enmod_core::{compile, CompileOptions, ProblemSession};
//!
//! let out = compile(&elements, &default_registry(), CompileOptions::default())?;
//! let mut session = ProblemSession::new(&out.objects, LpProblem::new());
//! let steps = session.run(start, Duration::hours(24), 7)?;
//! ```

pub mod checks;
pub mod concepts;
pub mod lowlevel;
pub mod objects;
pub mod problem;
pub mod registry;
pub mod test_utils;

pub use objects::{Arrow, Balance, BalanceKind, Flow, Storage};
pub use problem::LpProblem;
pub use registry::{default_registry, Builtin};
