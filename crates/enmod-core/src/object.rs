//! The model-object protocol.
//!
//! A compiled model object goes through two independent lifecycles:
//!
//! 1. **Assembly** ([`Assemble`]), once per compilation: derive state that
//!    depends on collaborators, such as the horizon a flow is modelled on.
//! 2. **Problem building** ([`ProblemParticipant`]), once per numeric
//!    problem: `build`, then `set_constants`, then `update` at every step of
//!    the rolling horizon. [`crate::session::ProblemSession`] enforces the
//!    order.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

use enmod_ts::{Horizon, ProbTime};
use serde::Serialize;

use crate::error::CoreResult;
use crate::identity::Id;
use crate::problem::Problem;

pub trait Assemble {
    /// Finalize derived state. `Ok(false)` means some collaborator is not
    /// assembled yet and the call should be repeated in a later round; the
    /// object must not have changed in that case.
    fn assemble(&mut self, ctx: &AssemblyContext<'_>) -> CoreResult<bool>;
}

pub trait ProblemParticipant {
    /// Declare variables and constraint blocks.
    fn build(&self, problem: &mut dyn Problem) -> CoreResult<()>;

    /// Write every term that is the same for all windows.
    fn set_constants(&self, problem: &mut dyn Problem) -> CoreResult<()>;

    /// Rewrite every term that depends on the window starting at `start`.
    fn update(&self, problem: &mut dyn Problem, start: &ProbTime) -> CoreResult<()>;

    /// Variables linking consecutive windows.
    fn state_variables(&self) -> Vec<StateVariable> {
        Vec::new()
    }
}

/// A compiled top-level object.
pub trait ModelObject: Assemble + ProblemParticipant + Debug + Send + Sync {
    fn id(&self) -> &Id;

    /// Identities this object refers to, top- or low-level.
    fn references(&self) -> Vec<Id> {
        Vec::new()
    }

    /// Horizon the object is modelled on, once known.
    fn horizon(&self) -> Option<Arc<dyn Horizon>> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Period `period` of variable block `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarRef {
    pub id: Id,
    pub period: usize,
}

impl VarRef {
    pub fn new(id: Id, period: usize) -> Self {
        Self { id, period }
    }
}

/// Pair of variables carrying state from one window to the next.
///
/// `incoming` is fixed to the state at the window start; after a solve the
/// value of `outgoing` becomes the next window's incoming state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVariable {
    pub incoming: VarRef,
    pub outgoing: VarRef,
    pub initial: f64,
}

/// Read access to the objects that already completed assembly.
pub struct AssemblyContext<'a> {
    objects: &'a BTreeMap<Id, Box<dyn ModelObject>>,
    assembled: &'a BTreeSet<Id>,
}

impl<'a> AssemblyContext<'a> {
    pub fn new(
        objects: &'a BTreeMap<Id, Box<dyn ModelObject>>,
        assembled: &'a BTreeSet<Id>,
    ) -> Self {
        Self { objects, assembled }
    }

    /// The object under `id`, only if it has completed assembly.
    pub fn get(&self, id: &Id) -> Option<&'a dyn ModelObject> {
        if !self.assembled.contains(id) {
            return None;
        }
        self.objects.get(id).map(|object| object.as_ref())
    }

    pub fn get_as<T: 'static>(&self, id: &Id) -> Option<&'a T> {
        self.get(id)?.as_any().downcast_ref::<T>()
    }

    pub fn is_assembled(&self, id: &Id) -> bool {
        self.assembled.contains(id)
    }

    /// Whether `id` is a top-level object at all, assembled or not.
    pub fn exists(&self, id: &Id) -> bool {
        self.objects.contains_key(id) || self.assembled.contains(id)
    }
}
