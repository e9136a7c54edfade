//! Two-tier storage of compiled objects.
//!
//! Top-level objects are the model objects handed back to callers; low-level
//! objects are shared building blocks (time vectors, params, horizons and
//! domain extensions) that top-level objects resolve during inclusion. An
//! [`Id`] occupies at most one slot across both tiers.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use enmod_ts::{ConstantParam, Horizon, Param, TimeVector};

use crate::element::{AttrValue, Attributes};
use crate::error::{CoreError, CoreResult};
use crate::identity::Id;
use crate::object::ModelObject;
use crate::registry::Deps;

/// Shared building block held in low-level storage.
#[derive(Clone)]
pub enum LowLevelObject {
    TimeVector(Arc<dyn TimeVector>),
    Param(Arc<dyn Param>),
    Horizon(Arc<dyn Horizon>),
    /// Domain objects the core does not know about, downcast by the
    /// handlers that read them.
    Extension(Arc<dyn Any + Send + Sync>),
}

impl LowLevelObject {
    pub fn kind(&self) -> &'static str {
        match self {
            LowLevelObject::TimeVector(_) => "time vector",
            LowLevelObject::Param(_) => "param",
            LowLevelObject::Horizon(_) => "horizon",
            LowLevelObject::Extension(_) => "extension",
        }
    }
}

impl fmt::Debug for LowLevelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowLevelObject::TimeVector(tv) => f.debug_tuple("TimeVector").field(tv).finish(),
            LowLevelObject::Param(param) => f.debug_tuple("Param").field(param).finish(),
            LowLevelObject::Horizon(horizon) => f.debug_tuple("Horizon").field(horizon).finish(),
            LowLevelObject::Extension(_) => f.write_str("Extension(..)"),
        }
    }
}

/// Mutable storage handed to inclusion handlers.
///
/// Every insert and every mutable access to a top-level object bumps a
/// revision counter, which the inclusion engine uses to check that handlers
/// only report success after changing storage and only defer without
/// changing it.
#[derive(Default)]
pub struct ObjectStores {
    top: BTreeMap<Id, Box<dyn ModelObject>>,
    low: BTreeMap<Id, LowLevelObject>,
    revision: u64,
    created: Vec<Id>,
}

impl ObjectStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Identities inserted so far, in insertion order.
    pub fn created(&self) -> &[Id] {
        &self.created
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.top.contains_key(id) || self.low.contains_key(id)
    }

    pub fn contains_top(&self, id: &Id) -> bool {
        self.top.contains_key(id)
    }

    pub fn contains_low(&self, id: &Id) -> bool {
        self.low.contains_key(id)
    }

    fn claim(&mut self, id: &Id) -> CoreResult<()> {
        if self.contains(id) {
            return Err(CoreError::Occupied(id.clone()));
        }
        self.revision += 1;
        self.created.push(id.clone());
        Ok(())
    }

    pub fn insert_top(&mut self, object: Box<dyn ModelObject>) -> CoreResult<()> {
        let id = object.id().clone();
        self.claim(&id)?;
        self.top.insert(id, object);
        Ok(())
    }

    pub fn insert_low(&mut self, id: Id, object: LowLevelObject) -> CoreResult<()> {
        self.claim(&id)?;
        self.low.insert(id, object);
        Ok(())
    }

    pub fn top(&self, id: &Id) -> Option<&dyn ModelObject> {
        self.top.get(id).map(|object| object.as_ref())
    }

    pub fn top_mut(&mut self, id: &Id) -> Option<&mut dyn ModelObject> {
        let object = self.top.get_mut(id)?;
        self.revision += 1;
        Some(object.as_mut())
    }

    /// Typed read access to a top-level object.
    pub fn top_as<T: 'static>(&self, id: &Id) -> Option<&T> {
        self.top.get(id)?.as_any().downcast_ref::<T>()
    }

    /// Typed mutable access to a top-level object. Counts as a mutation.
    pub fn top_as_mut<T: 'static>(&mut self, id: &Id) -> Option<&mut T> {
        let object = self.top.get_mut(id)?;
        let typed = object.as_any_mut().downcast_mut::<T>()?;
        self.revision += 1;
        Some(typed)
    }

    pub fn low(&self, id: &Id) -> Option<&LowLevelObject> {
        self.low.get(id)
    }

    /// Param stored under `id`; `Ok(None)` if the slot is empty, an error if
    /// it holds something else.
    pub fn param(&self, id: &Id) -> CoreResult<Option<Arc<dyn Param>>> {
        match self.low.get(id) {
            None => Ok(None),
            Some(LowLevelObject::Param(param)) => Ok(Some(param.clone())),
            Some(other) => Err(wrong_kind(id, "param", other)),
        }
    }

    pub fn time_vector(&self, id: &Id) -> CoreResult<Option<Arc<dyn TimeVector>>> {
        match self.low.get(id) {
            None => Ok(None),
            Some(LowLevelObject::TimeVector(tv)) => Ok(Some(tv.clone())),
            Some(other) => Err(wrong_kind(id, "time vector", other)),
        }
    }

    pub fn horizon(&self, id: &Id) -> CoreResult<Option<Arc<dyn Horizon>>> {
        match self.low.get(id) {
            None => Ok(None),
            Some(LowLevelObject::Horizon(horizon)) => Ok(Some(horizon.clone())),
            Some(other) => Err(wrong_kind(id, "horizon", other)),
        }
    }

    pub fn extension<T: Any + Send + Sync>(&self, id: &Id) -> CoreResult<Option<Arc<T>>> {
        match self.low.get(id) {
            None => Ok(None),
            Some(LowLevelObject::Extension(ext)) => ext
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| {
                    CoreError::Validation(format!(
                        "{id} holds an extension of an unexpected type"
                    ))
                }),
            Some(other) => Err(wrong_kind(id, "extension", other)),
        }
    }

    /// Resolve an attribute that is either a number (an inline constant) or
    /// the name of a param stored under `concept`.
    ///
    /// Returns `Ok(None)` when the referenced param does not exist yet; the
    /// looked-up identity is recorded in `deps`.
    pub fn resolve_param(
        &self,
        value: &Attributes,
        key: &str,
        concept: &str,
        deps: &mut Deps,
    ) -> CoreResult<Option<ParamRef>> {
        match value.get(key)? {
            AttrValue::Number(number) => Ok(Some(ParamRef {
                id: None,
                param: Arc::new(ConstantParam::new(*number)),
            })),
            AttrValue::Text(name) => {
                let id = deps.track(Id::new(concept, name.as_str()));
                Ok(self.param(&id)?.map(|param| ParamRef {
                    id: Some(id),
                    param,
                }))
            }
            other => Err(CoreError::Attribute(crate::element::AttrError::WrongType {
                key: key.to_string(),
                expected: "number or reference",
                found: other.kind(),
            })),
        }
    }

    pub fn top_ids(&self) -> impl Iterator<Item = &Id> {
        self.top.keys()
    }

    pub fn low_ids(&self) -> impl Iterator<Item = &Id> {
        self.low.keys()
    }

    pub fn len(&self) -> usize {
        self.top.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.low.is_empty()
    }

    pub fn into_model_objects(self) -> ModelObjects {
        ModelObjects {
            top: self.top,
            low: self.low,
        }
    }
}

impl fmt::Debug for ObjectStores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStores")
            .field("top", &self.top.keys().collect::<Vec<_>>())
            .field("low", &self.low.keys().collect::<Vec<_>>())
            .field("revision", &self.revision)
            .finish()
    }
}

fn wrong_kind(id: &Id, expected: &str, found: &LowLevelObject) -> CoreError {
    CoreError::Validation(format!(
        "{id} should be a {expected} but holds a {}",
        found.kind()
    ))
}

/// A param resolved from an attribute, with the identity it came from
/// (`None` for inline numbers).
#[derive(Debug, Clone)]
pub struct ParamRef {
    pub id: Option<Id>,
    pub param: Arc<dyn Param>,
}

/// The compiled object graph returned to callers.
#[derive(Default)]
pub struct ModelObjects {
    pub(crate) top: BTreeMap<Id, Box<dyn ModelObject>>,
    pub(crate) low: BTreeMap<Id, LowLevelObject>,
}

impl ModelObjects {
    pub fn get(&self, id: &Id) -> Option<&dyn ModelObject> {
        self.top.get(id).map(|object| object.as_ref())
    }

    pub fn get_as<T: 'static>(&self, id: &Id) -> Option<&T> {
        self.top.get(id)?.as_any().downcast_ref::<T>()
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.top.contains_key(id) || self.low.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.top.keys()
    }

    /// Top-level objects in `Id` order.
    pub fn iter(&self) -> impl Iterator<Item = (&Id, &dyn ModelObject)> {
        self.top.iter().map(|(id, object)| (id, object.as_ref()))
    }

    pub fn low_level(&self) -> &BTreeMap<Id, LowLevelObject> {
        &self.low
    }

    pub fn len(&self) -> usize {
        self.top.len()
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// Debug rendering of every top-level object, one per line. Two graphs
    /// with equal fingerprints are structurally equal.
    pub fn fingerprint(&self) -> String {
        self.top
            .values()
            .map(|object| format!("{object:?}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Debug for ModelObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.top.iter()).finish()
    }
}
