//! Registry of inclusion handlers.
//!
//! The registry maps a `(concept, type)` pair to the handler that turns a
//! data element of that type into model objects. It is an explicit value
//! passed to [`crate::compile`], so several registries with different
//! extensions can coexist in one process.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::diagnostics::Diagnostics;
use crate::element::Attributes;
use crate::error::CoreResult;
use crate::identity::{ElementKey, Id, TypeKey};
use crate::store::{ModelObjects, ObjectStores};

/// Identities a handler looked up during one attempt, satisfied or not,
/// plus optional human-readable notes for the root-cause report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deps {
    pub ids: Vec<Id>,
    pub messages: Vec<String>,
}

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` and hand it back for the lookup that follows.
    pub fn track(&mut self, id: Id) -> Id {
        if !self.ids.contains(&id) {
            self.ids.push(id.clone());
        }
        id
    }

    pub fn push(&mut self, id: Id) {
        self.track(id);
    }

    pub fn message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.messages.is_empty()
    }
}

/// Outcome of one inclusion attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Inclusion {
    /// The element is fully incorporated into storage.
    Included(Deps),
    /// Some referenced object is not available yet.
    Deferred(Deps),
    /// Deferred, with extra context such as which alternatives were tried.
    DeferredWithMessages(Deps, Vec<String>),
}

impl Inclusion {
    pub fn deps(&self) -> &Deps {
        match self {
            Inclusion::Included(deps)
            | Inclusion::Deferred(deps)
            | Inclusion::DeferredWithMessages(deps, _) => deps,
        }
    }

    pub fn is_included(&self) -> bool {
        matches!(self, Inclusion::Included(_))
    }

    /// Dependency record of the attempt, auxiliary messages folded in.
    pub fn into_record(self) -> Deps {
        match self {
            Inclusion::Included(deps) | Inclusion::Deferred(deps) => deps,
            Inclusion::DeferredWithMessages(mut deps, messages) => {
                deps.messages.extend(messages);
                deps
            }
        }
    }
}

/// Per-type inclusion function.
///
/// A handler may be invoked many times for the same element. It must either
/// mutate storage and return [`Inclusion::Included`], or leave storage
/// untouched and return a deferral. Invalid input is an `Err`, never a
/// deferral.
pub trait IncludeHandler: Send + Sync {
    fn include(
        &self,
        stores: &mut ObjectStores,
        key: &ElementKey,
        value: &Attributes,
    ) -> CoreResult<Inclusion>;

    /// References that can be read off the attributes without compiling,
    /// used by dataset pre-validation.
    fn references(&self, _key: &ElementKey, _value: &Attributes) -> Vec<Id> {
        Vec::new()
    }
}

impl<F> IncludeHandler for F
where
    F: Fn(&mut ObjectStores, &ElementKey, &Attributes) -> CoreResult<Inclusion> + Send + Sync,
{
    fn include(
        &self,
        stores: &mut ObjectStores,
        key: &ElementKey,
        value: &Attributes,
    ) -> CoreResult<Inclusion> {
        self(stores, key, value)
    }
}

/// Extra post-compilation check over the assembled objects. Checks only
/// report; they cannot fail the compilation.
pub type ObjectCheck = fn(&ModelObjects, &mut Diagnostics);

/// Holds the handler for every known `(concept, type)` pair.
#[derive(Default, Clone)]
pub struct TypeRegistry {
    handlers: HashMap<TypeKey, Arc<dyn IncludeHandler>>,
    checks: Vec<ObjectCheck>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous handler for the pair.
    pub fn register(
        &mut self,
        concept: &str,
        type_name: &str,
        handler: impl IncludeHandler + 'static,
    ) -> &mut Self {
        self.register_arc(TypeKey::new(concept, type_name), Arc::new(handler))
    }

    pub fn register_arc(&mut self, key: TypeKey, handler: Arc<dyn IncludeHandler>) -> &mut Self {
        self.handlers.insert(key, handler);
        self
    }

    pub fn get(&self, key: &TypeKey) -> Option<Arc<dyn IncludeHandler>> {
        self.handlers.get(key).cloned()
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run `check` after every validated compilation with this registry.
    pub fn add_object_check(&mut self, check: ObjectCheck) -> &mut Self {
        self.checks.push(check);
        self
    }

    pub fn object_checks(&self) -> &[ObjectCheck] {
        &self.checks
    }

    /// Registered pairs, sorted.
    pub fn type_keys(&self) -> Vec<&TypeKey> {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.type_keys())
            .field("checks", &self.checks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LowLevelObject;
    use enmod_ts::ConstantParam;

    struct StaticRefs;

    impl IncludeHandler for StaticRefs {
        fn include(
            &self,
            _stores: &mut ObjectStores,
            _key: &ElementKey,
            _value: &Attributes,
        ) -> CoreResult<Inclusion> {
            Ok(Inclusion::Deferred(Deps::new()))
        }

        fn references(&self, _key: &ElementKey, value: &Attributes) -> Vec<Id> {
            value
                .opt_text("Target")
                .ok()
                .flatten()
                .map(|name| vec![Id::new("Flow", name)])
                .unwrap_or_default()
        }
    }

    #[test]
    fn test_register_closure_and_lookup() {
        let mut registry = TypeRegistry::new();
        registry.register(
            "Param",
            "ConstantParam",
            |stores: &mut ObjectStores,
             key: &ElementKey,
             value: &Attributes|
             -> CoreResult<Inclusion> {
                let param = ConstantParam::new(value.number("Value")?);
                stores.insert_low(key.id(), LowLevelObject::Param(Arc::new(param)))?;
                Ok(Inclusion::Included(Deps::new()))
            },
        );

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&TypeKey::new("Param", "ConstantParam")));
        assert!(registry.get(&TypeKey::new("Param", "VectorParam")).is_none());

        let handler = registry.get(&TypeKey::new("Param", "ConstantParam")).unwrap();
        let mut stores = ObjectStores::new();
        let key = ElementKey::new("Param", "ConstantParam", "p");
        let result = handler
            .include(&mut stores, &key, &Attributes::new().with("Value", 3.0))
            .unwrap();
        assert!(result.is_included());
        assert!(stores.contains(&Id::new("Param", "p")));
    }

    #[test]
    fn test_static_references_default_empty() {
        let mut registry = TypeRegistry::new();
        registry.register("Custom", "WithRefs", StaticRefs);
        registry.register(
            "Custom",
            "NoRefs",
            |_: &mut ObjectStores, _: &ElementKey, _: &Attributes| -> CoreResult<Inclusion> {
                Ok(Inclusion::Deferred(Deps::new()))
            },
        );

        let key = ElementKey::new("Custom", "WithRefs", "x");
        let attrs = Attributes::new().with("Target", "F");
        let with_refs = registry.get(&key.type_key()).unwrap();
        assert_eq!(with_refs.references(&key, &attrs), vec![Id::new("Flow", "F")]);

        let no_refs = registry.get(&TypeKey::new("Custom", "NoRefs")).unwrap();
        assert!(no_refs.references(&key, &attrs).is_empty());
    }

    #[test]
    fn test_deferred_messages_fold_into_record() {
        let mut deps = Deps::new();
        deps.push(Id::new("Price", "P"));
        deps.push(Id::new("Price", "P"));
        let record =
            Inclusion::DeferredWithMessages(deps, vec!["no Price:P or Param:P".into()])
                .into_record();
        assert_eq!(record.ids.len(), 1);
        assert_eq!(record.messages, vec!["no Price:P or Param:P".to_string()]);
    }
}
