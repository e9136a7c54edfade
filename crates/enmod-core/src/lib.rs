//! # enmod-core: data-element compilation engine
//!
//! Turns a flat collection of typed, named, cross-referencing records
//! ([`DataElement`]) into an assembled graph of model objects, and drives the
//! incremental problem-building protocol of those objects.
//!
//! ## Pipeline
//!
//! 1. [`TypeRegistry`] dispatches every element to the handler of its
//!    `(concept, type)` pair.
//! 2. [`inclusion::include_elements`] runs handlers to a fixed point,
//!    recording what each attempt depended on.
//! 3. [`assembly::assemble`] finalizes cross-object derived state.
//! 4. [`validation`] checks that every reference resolves.
//! 5. On a stalled fixed point, [`root_cause`] separates root causes from
//!    cascades and produces a [`ResolutionReport`].
//!
//! [`compile`] runs steps 1-4. A [`ProblemSession`] then takes the compiled
//! [`ModelObjects`] through `build`, `set_constants` and `update` against any
//! [`Problem`] implementation.

pub mod assembly;
pub mod compile;
pub mod diagnostics;
pub mod element;
pub mod error;
pub mod graph_utils;
pub mod identity;
pub mod inclusion;
pub mod object;
pub mod problem;
pub mod registry;
pub mod root_cause;
pub mod session;
pub mod store;
pub mod validation;

pub use compile::{compile, CompileOptions, CompileOutput, DependencyIndexMap};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use element::{AttrError, AttrValue, Attributes, DataElement};
pub use error::{CoreError, CoreResult};
pub use graph_utils::{dependency_closure, dependency_graph, dependency_stats, DependencyStats};
pub use identity::{ElementKey, Id, TypeKey};
pub use object::{Assemble, AssemblyContext, ModelObject, ProblemParticipant, StateVariable, VarRef};
pub use problem::{ConstraintSense, Problem, ProblemError, ProblemResult};
pub use registry::{Deps, IncludeHandler, Inclusion, ObjectCheck, TypeRegistry};
pub use root_cause::{ResolutionReport, RootCause};
pub use session::{ProblemSession, Stage, StepResult};
pub use store::{LowLevelObject, ModelObjects, ObjectStores, ParamRef};
pub use validation::{validate_dataset, validate_objects};
