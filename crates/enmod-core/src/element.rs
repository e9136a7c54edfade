//! Data elements: the flat, immutable input records of a dataset.

use crate::identity::{ElementKey, Id, TypeKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// One attribute value. References to other elements are plain `Text`
/// values holding the referenced instance name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Text(String),
    NumberList(Vec<f64>),
    TextList(Vec<String>),
    Table(Attributes),
}

impl AttrValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AttrValue::Number(_) => "number",
            AttrValue::Text(_) => "text",
            AttrValue::NumberList(_) => "number list",
            AttrValue::TextList(_) => "text list",
            AttrValue::Table(_) => "table",
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        AttrValue::NumberList(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::TextList(value)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(value: Vec<&str>) -> Self {
        AttrValue::TextList(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Attributes> for AttrValue {
    fn from(value: Attributes) -> Self {
        AttrValue::Table(value)
    }
}

/// Failed attribute lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttrError {
    #[error("missing attribute '{key}'")]
    Missing { key: String },

    #[error("attribute '{key}' should be a {expected}, found {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Ordered attribute map of a data element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Result<&AttrValue, AttrError> {
        self.0.get(key).ok_or_else(|| AttrError::Missing {
            key: key.to_string(),
        })
    }

    pub fn number(&self, key: &str) -> Result<f64, AttrError> {
        match self.get(key)? {
            AttrValue::Number(value) => Ok(*value),
            other => Err(wrong_type(key, "number", other)),
        }
    }

    pub fn text(&self, key: &str) -> Result<&str, AttrError> {
        match self.get(key)? {
            AttrValue::Text(value) => Ok(value),
            other => Err(wrong_type(key, "text", other)),
        }
    }

    /// A number list; an empty list deserializes as either list kind and is
    /// accepted here.
    pub fn number_list(&self, key: &str) -> Result<&[f64], AttrError> {
        match self.get(key)? {
            AttrValue::NumberList(values) => Ok(values),
            AttrValue::TextList(values) if values.is_empty() => Ok(&[]),
            other => Err(wrong_type(key, "number list", other)),
        }
    }

    pub fn text_list(&self, key: &str) -> Result<&[String], AttrError> {
        match self.get(key)? {
            AttrValue::TextList(values) => Ok(values),
            AttrValue::NumberList(values) if values.is_empty() => Ok(&[]),
            other => Err(wrong_type(key, "text list", other)),
        }
    }

    pub fn table(&self, key: &str) -> Result<&Attributes, AttrError> {
        match self.get(key)? {
            AttrValue::Table(table) => Ok(table),
            other => Err(wrong_type(key, "table", other)),
        }
    }

    pub fn opt_number(&self, key: &str) -> Result<Option<f64>, AttrError> {
        if self.contains(key) {
            self.number(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn opt_text(&self, key: &str) -> Result<Option<&str>, AttrError> {
        if self.contains(key) {
            self.text(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn wrong_type(key: &str, expected: &'static str, found: &AttrValue) -> AttrError {
    AttrError::WrongType {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

/// One raw input record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataElement {
    #[serde(flatten)]
    pub key: ElementKey,
    #[serde(default)]
    pub value: Attributes,
}

impl DataElement {
    pub fn new(
        concept: impl Into<String>,
        type_name: impl Into<String>,
        instance: impl Into<String>,
        value: Attributes,
    ) -> Self {
        Self {
            key: ElementKey::new(concept, type_name, instance),
            value,
        }
    }

    pub fn id(&self) -> Id {
        self.key.id()
    }

    pub fn type_key(&self) -> TypeKey {
        self.key.type_key()
    }
}

impl fmt::Display for DataElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors() {
        let attrs = Attributes::new()
            .with("Value", 2.5)
            .with("Flow", "F")
            .with("Values", vec![1.0, 2.0]);

        assert_eq!(attrs.number("Value").unwrap(), 2.5);
        assert_eq!(attrs.text("Flow").unwrap(), "F");
        assert_eq!(attrs.number_list("Values").unwrap(), &[1.0, 2.0]);
        assert_eq!(attrs.opt_text("Loss").unwrap(), None);
    }

    #[test]
    fn test_accessor_errors() {
        let attrs = Attributes::new().with("Flow", "F");
        assert_eq!(
            attrs.number("Value"),
            Err(AttrError::Missing {
                key: "Value".into()
            })
        );
        let err = attrs.number("Flow").unwrap_err();
        assert_eq!(
            err.to_string(),
            "attribute 'Flow' should be a number, found text"
        );
        assert!(attrs.opt_number("Flow").is_err());
    }

    #[test]
    fn test_element_json_shape() {
        let json = r#"{
            "concept": "Arrow",
            "type": "BaseArrow",
            "instance": "A",
            "value": {"Flow": "F", "Conversion": 1.0, "Nested": {"x": [1.0, 2.0]}}
        }"#;
        let element: DataElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.key.to_string(), "Arrow:BaseArrow:A");
        assert_eq!(element.value.text("Flow").unwrap(), "F");
        assert_eq!(element.value.number("Conversion").unwrap(), 1.0);
        let nested = element.value.table("Nested").unwrap();
        assert_eq!(nested.number_list("x").unwrap(), &[1.0, 2.0]);
    }
}
