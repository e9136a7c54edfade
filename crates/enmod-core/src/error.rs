//! Error type of the compilation engine and the problem-building protocol.
//!
//! Every fatal condition surfaces as one [`CoreError`] variant. Nothing is
//! retried; the only soft failure is a handler deferring inside the
//! fixed-point loop, which never reaches this type unless the loop stalls.

use crate::element::AttrError;
use crate::identity::{ElementKey, Id, TypeKey};
use crate::problem::ProblemError;
use crate::root_cause::ResolutionReport;
use enmod_ts::TsError;
use std::fmt::Display;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Two or more input elements share an element key
    #[error("Duplicate elements: {}", join(.0))]
    DuplicateElements(Vec<ElementKey>),

    /// No handler registered for the element's (concept, type)
    #[error("Unregistered type {type_key} (element {element})")]
    UnregisteredType { type_key: TypeKey, element: ElementKey },

    /// A handler broke the inclusion contract
    #[error("Malformed handler return for {element}: {reason}")]
    MalformedReturn { element: ElementKey, reason: String },

    /// The fixed point stalled; carries the root-cause report
    #[error("{0}")]
    Unresolvable(ResolutionReport),

    /// Referential integrity check failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Assembly fixed point stalled
    #[error("Assembly deadlock: {} object(s) never assembled: {}", .pending.len(), join(.pending))]
    AssemblyDeadlock { pending: Vec<Id> },

    /// Business-rule or structural violation ("no arrows for flow X")
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Attribute error: {0}")]
    Attribute(#[from] AttrError),

    /// Insert into an identity that already holds an object
    #[error("Storage slot {0} is already occupied")]
    Occupied(Id),

    #[error("Problem error: {0}")]
    Problem(#[from] ProblemError),

    /// Protocol method called out of order
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("Time error: {0}")]
    Ts(#[from] TsError),

    /// Handler error annotated with the element that raised it
    #[error("{key}: {source}")]
    Element {
        key: ElementKey,
        source: Box<CoreError>,
    },

    #[error("{0}")]
    Other(String),
}

impl CoreError {
    pub fn structural(message: impl Into<String>) -> Self {
        CoreError::Structural(message.into())
    }

    pub fn in_element(key: &ElementKey, source: CoreError) -> Self {
        CoreError::Element {
            key: key.clone(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through [`CoreError::Element`] wrappers.
    pub fn root(&self) -> &CoreError {
        match self {
            CoreError::Element { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Other(err.to_string())
    }
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::DuplicateElements(vec![ElementKey::new("Flow", "BaseFlow", "F")]);
        assert_eq!(err.to_string(), "Duplicate elements: Flow:BaseFlow:F");

        let err = CoreError::AssemblyDeadlock {
            pending: vec![Id::new("Flow", "F"), Id::new("Storage", "S")],
        };
        assert!(err.to_string().contains("2 object(s) never assembled"));
        assert!(err.to_string().contains("Flow:F, Storage:S"));
    }

    #[test]
    fn test_element_wrapper_keeps_root() {
        let key = ElementKey::new("Loss", "SimpleLoss", "L");
        let source = CoreError::structural("loss factor 1.5 outside [0, 1]");
        let err = CoreError::in_element(&key, source);
        assert_eq!(
            err.to_string(),
            "Loss:SimpleLoss:L: Structural error: loss factor 1.5 outside [0, 1]"
        );
        assert!(matches!(err.root(), CoreError::Structural(_)));
    }

    #[test]
    fn test_attribute_error_conversion() {
        fn lookup() -> CoreResult<f64> {
            let attrs = crate::element::Attributes::new();
            Ok(attrs.number("Value")?)
        }
        assert!(matches!(lookup(), Err(CoreError::Attribute(AttrError::Missing { .. }))));
    }
}
