//! Identity and key types for data elements and model objects.
//!
//! Three name tuples identify everything the engine touches:
//!
//! - [`Id`] `(concept, instance)`: a compiled model object
//! - [`ElementKey`] `(concept, type, instance)`: one raw input record
//! - [`TypeKey`] `(concept, type)`: the registry dispatch key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a compiled model object, displayed as `Concept:instance`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id {
    pub concept: String,
    pub instance: String,
}

impl Id {
    pub fn new(concept: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.concept, self.instance)
    }
}

/// Registry lookup key, independent of the instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey {
    pub concept: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypeKey {
    pub fn new(concept: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.concept, self.type_name)
    }
}

/// Key of one raw input record, displayed as `Concept:Type:instance`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementKey {
    pub concept: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub instance: String,
}

impl ElementKey {
    pub fn new(
        concept: impl Into<String>,
        type_name: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            concept: concept.into(),
            type_name: type_name.into(),
            instance: instance.into(),
        }
    }

    /// The object identity this element would naturally produce.
    pub fn id(&self) -> Id {
        Id::new(self.concept.clone(), self.instance.clone())
    }

    pub fn type_key(&self) -> TypeKey {
        TypeKey::new(self.concept.clone(), self.type_name.clone())
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.concept, self.type_name, self.instance)
    }
}
