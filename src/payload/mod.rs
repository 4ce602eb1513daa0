//! Typed payload model: schemas, the shared type registry, and token containers.
//!
//! Every token that travels through a simulation carries one or more typed
//! payloads. A payload schema is a [`GenType`]: a named record mapping
//! attribute names to a declared kind plus a current value. Schemas are
//! registered once at configuration load into the shared [`GenTypeState`]
//! and are cloned into [`GenContainer`]s as generators emit tokens.
//!
//! # Attribute discipline
//!
//! Each attribute declares one of five kinds ([`AttrKind`]); the stored value
//! must match its declared kind at all times. Both [`GenType::create_attribute`]
//! and [`GenType::update_value`] enforce the match, with integers and floats
//! treated as distinct kinds.
//!
//! # Examples
//!
//! ```
//! use simflow::payload::{AttrKind, GenType};
//! use serde_json::json;
//!
//! let mut order = GenType::new("order", "gen-1");
//! order.create_attribute("qty", AttrKind::Int, json!(3)).unwrap();
//! assert_eq!(order.get_value("qty"), Some(&json!(3)));
//!
//! // Kind is enforced on update: an int attribute cannot become a float.
//! assert!(order.update_value("qty", json!(2.5)).is_err());
//! ```

mod container;

pub use container::GenContainer;

use std::fmt;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Declared kind of a payload attribute.
///
/// Integers and floats are distinct kinds: replacing an int value with a
/// float is a [`PayloadError::KindMismatch`], never a silent widening.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttrKind {
    Str,
    Int,
    Float,
    Bool,
    Dict,
}

impl AttrKind {
    /// Classify a JSON value into an attribute kind.
    ///
    /// Returns `None` for values no attribute kind covers (null, arrays).
    /// A JSON number is `Int` when it is losslessly an `i64`, `Float`
    /// otherwise.
    #[must_use]
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(Self::Str),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self::Int),
            Value::Number(_) => Some(Self::Float),
            Value::Bool(_) => Some(Self::Bool),
            Value::Object(_) => Some(Self::Dict),
            Value::Null | Value::Array(_) => None,
        }
    }

    /// Whether `value` matches this declared kind.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        AttrKind::of(value) == Some(self)
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Dict => "dict",
        };
        write!(f, "{name}")
    }
}

/// Errors raised by payload schema and registry operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PayloadError {
    /// A value's runtime kind does not match the attribute's declared kind.
    #[error("kind mismatch for attribute '{attribute}': declared {declared}, got {actual}")]
    #[diagnostic(code(simflow::payload::kind_mismatch))]
    KindMismatch {
        attribute: String,
        declared: AttrKind,
        actual: String,
    },

    /// Attempt to create an attribute that already exists.
    #[error("attribute '{0}' already exists")]
    #[diagnostic(code(simflow::payload::attribute_exists))]
    AttributeExists(String),

    /// Attempt to read, update, or delete a missing attribute.
    #[error("attribute '{0}' not found")]
    #[diagnostic(code(simflow::payload::attribute_not_found))]
    AttributeNotFound(String),

    /// Attempt to register a payload type name twice.
    #[error("payload type '{0}' already exists")]
    #[diagnostic(code(simflow::payload::type_exists))]
    TypeExists(String),

    /// Lookup of an unregistered payload type.
    #[error("payload type '{0}' not found")]
    #[diagnostic(code(simflow::payload::type_not_found))]
    TypeNotFound(String),
}

fn kind_name(value: &Value) -> String {
    match AttrKind::of(value) {
        Some(kind) => kind.to_string(),
        None => match value {
            Value::Null => "null".to_string(),
            Value::Array(_) => "list".to_string(),
            _ => "unknown".to_string(),
        },
    }
}

/// A single typed attribute: declared kind plus current value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenAttribute {
    #[serde(rename = "type")]
    pub kind: AttrKind,
    pub value: Value,
}

/// A named payload schema: attribute names mapped to typed values.
///
/// Created once at configuration load and mutated only through the explicit
/// attribute operations below; schemas live in the shared [`GenTypeState`]
/// until the simulation ends.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenType {
    pub type_name: String,
    pub gen_component_id: String,
    #[serde(default)]
    pub attributes: FxHashMap<String, GenAttribute>,
}

impl GenType {
    pub fn new(type_name: impl Into<String>, gen_component_id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            gen_component_id: gen_component_id.into(),
            attributes: FxHashMap::default(),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&GenAttribute> {
        self.attributes.get(name)
    }

    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).map(|attr| &attr.value)
    }

    /// Replace an attribute's value, keeping its declared kind.
    ///
    /// The new value's runtime kind must match the declared kind; a missing
    /// attribute is an error.
    pub fn update_value(&mut self, name: &str, value: Value) -> Result<(), PayloadError> {
        let attr = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| PayloadError::AttributeNotFound(name.to_string()))?;
        if !attr.kind.matches(&value) {
            return Err(PayloadError::KindMismatch {
                attribute: name.to_string(),
                declared: attr.kind,
                actual: kind_name(&value),
            });
        }
        attr.value = value;
        Ok(())
    }

    /// Add a new attribute with a declared kind and initial value.
    ///
    /// The value must match the declared kind; duplicates are rejected.
    pub fn create_attribute(
        &mut self,
        name: impl Into<String>,
        kind: AttrKind,
        value: Value,
    ) -> Result<(), PayloadError> {
        let name = name.into();
        if self.attributes.contains_key(&name) {
            return Err(PayloadError::AttributeExists(name));
        }
        if !kind.matches(&value) {
            return Err(PayloadError::KindMismatch {
                attribute: name,
                declared: kind,
                actual: kind_name(&value),
            });
        }
        self.attributes.insert(name, GenAttribute { kind, value });
        Ok(())
    }

    pub fn delete_attribute(&mut self, name: &str) -> Result<(), PayloadError> {
        self.attributes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| PayloadError::AttributeNotFound(name.to_string()))
    }
}

/// The shared payload type registry: `typeName -> GenType`.
///
/// Read-mostly; lookups happen on every token build. Keys are unique.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenTypeState {
    types: FxHashMap<String, GenType>,
}

impl GenTypeState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, gen_type: GenType) -> Result<(), PayloadError> {
        if self.types.contains_key(&gen_type.type_name) {
            return Err(PayloadError::TypeExists(gen_type.type_name));
        }
        self.types.insert(gen_type.type_name.clone(), gen_type);
        Ok(())
    }

    pub fn remove(&mut self, type_name: &str) -> Result<GenType, PayloadError> {
        self.types
            .remove(type_name)
            .ok_or_else(|| PayloadError::TypeNotFound(type_name.to_string()))
    }

    pub fn get(&self, type_name: &str) -> Option<&GenType> {
        self.types.get(type_name)
    }

    pub fn get_mut(&mut self, type_name: &str) -> Option<&mut GenType> {
        self.types.get_mut(type_name)
    }

    /// Update one attribute of a registered type.
    pub fn update_value(
        &mut self,
        type_name: &str,
        attr_name: &str,
        value: Value,
    ) -> Result<(), PayloadError> {
        let gen_type = self
            .types
            .get_mut(type_name)
            .ok_or_else(|| PayloadError::TypeNotFound(type_name.to_string()))?;
        gen_type.update_value(attr_name, value)
    }

    /// Whether a candidate schema agrees with the registered one on
    /// `typeName` and originating component.
    #[must_use]
    pub fn matches_registered(&self, type_name: &str, candidate: &GenType) -> bool {
        self.types.get(type_name).is_some_and(|registered| {
            registered.type_name == candidate.type_name
                && registered.gen_component_id == candidate.gen_component_id
        })
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attr_kind_classifies_numbers_strictly() {
        assert_eq!(AttrKind::of(&json!(1)), Some(AttrKind::Int));
        assert_eq!(AttrKind::of(&json!(1.5)), Some(AttrKind::Float));
        assert_eq!(AttrKind::of(&json!("x")), Some(AttrKind::Str));
        assert_eq!(AttrKind::of(&json!({"a": 1})), Some(AttrKind::Dict));
        assert_eq!(AttrKind::of(&json!(null)), None);
        assert_eq!(AttrKind::of(&json!([1, 2])), None);
    }

    #[test]
    fn create_rejects_duplicate_and_mismatch() {
        let mut t = GenType::new("item", "gen");
        t.create_attribute("w", AttrKind::Float, json!(0.5)).unwrap();
        assert!(matches!(
            t.create_attribute("w", AttrKind::Float, json!(0.7)),
            Err(PayloadError::AttributeExists(_))
        ));
        assert!(matches!(
            t.create_attribute("n", AttrKind::Int, json!("nope")),
            Err(PayloadError::KindMismatch { .. })
        ));
    }

    #[test]
    fn registry_rejects_duplicate_type_names() {
        let mut state = GenTypeState::new();
        state.insert(GenType::new("item", "g1")).unwrap();
        assert!(matches!(
            state.insert(GenType::new("item", "g2")),
            Err(PayloadError::TypeExists(_))
        ));
    }

    #[test]
    fn matches_registered_checks_origin() {
        let mut state = GenTypeState::new();
        state.insert(GenType::new("item", "g1")).unwrap();
        assert!(state.matches_registered("item", &GenType::new("item", "g1")));
        assert!(!state.matches_registered("item", &GenType::new("item", "g2")));
        assert!(!state.matches_registered("other", &GenType::new("other", "g1")));
    }
}
