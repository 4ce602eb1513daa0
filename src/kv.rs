//! Per-component key-value state bag.
//!
//! Every component owns a [`KvStore`]: a string-keyed open map seeded from
//! the component's configured custom inputs and mutated freely by user code
//! between suspension points. `update` is kind-checked: the replacement
//! value must have the same [`ValueKind`] as the stored one, and integers
//! and floats are distinct kinds.

use std::fmt;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

/// Runtime kind of a stored JSON value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Dict,
}

impl ValueKind {
    /// Classify a JSON value. A number is `Int` when losslessly an `i64`,
    /// `Float` otherwise.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Int,
            Value::Number(_) => Self::Float,
            Value::String(_) => Self::Str,
            Value::Array(_) => Self::List,
            Value::Object(_) => Self::Dict,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Dict => "dict",
        };
        write!(f, "{name}")
    }
}

/// Errors raised by [`KvStore`] operations.
#[derive(Debug, Error, Diagnostic)]
pub enum KvError {
    #[error("key '{0}' not found")]
    #[diagnostic(code(simflow::kv::not_found))]
    NotFound(String),

    #[error("kind mismatch for key '{key}': stored {stored}, got {new}")]
    #[diagnostic(
        code(simflow::kv::kind_mismatch),
        help("`update` keeps the stored kind; use `set` to replace a value wholesale.")
    )]
    KindMismatch {
        key: String,
        stored: ValueKind,
        new: ValueKind,
    },
}

/// String-keyed mutable state bag with kind-checked updates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KvStore {
    storage: FxHashMap<String, Value>,
}

impl KvStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(storage: FxHashMap<String, Value>) -> Self {
        Self { storage }
    }

    /// Set a key unconditionally, inserting or replacing.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.storage.insert(key.into(), value);
    }

    /// Read a key; missing keys are `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.storage.get(key)
    }

    /// Remove a key; missing keys are an error.
    pub fn delete(&mut self, key: &str) -> Result<Value, KvError> {
        self.storage
            .remove(key)
            .ok_or_else(|| KvError::NotFound(key.to_string()))
    }

    pub fn clear(&mut self) {
        self.storage.clear();
    }

    /// Replace an existing value with one of the same kind.
    pub fn update(&mut self, key: &str, value: Value) -> Result<(), KvError> {
        let slot = self
            .storage
            .get_mut(key)
            .ok_or_else(|| KvError::NotFound(key.to_string()))?;
        let stored = ValueKind::of(slot);
        let new = ValueKind::of(&value);
        if stored != new {
            return Err(KvError::KindMismatch {
                key: key.to_string(),
                stored,
                new,
            });
        }
        *slot = value;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.storage.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_missing_is_none_but_delete_missing_errors() {
        let mut kv = KvStore::new();
        assert!(kv.get("x").is_none());
        assert!(matches!(kv.delete("x"), Err(KvError::NotFound(_))));
    }

    #[test]
    fn update_keeps_kind_and_rejects_widening() {
        let mut kv = KvStore::new();
        kv.set("count", json!(1));
        kv.update("count", json!(2)).unwrap();
        assert_eq!(kv.get("count"), Some(&json!(2)));

        // int -> float is a mismatch under the strict rule
        assert!(matches!(
            kv.update("count", json!(2.5)),
            Err(KvError::KindMismatch { .. })
        ));
        assert!(matches!(
            kv.update("missing", json!(1)),
            Err(KvError::NotFound(_))
        ));
    }

    #[test]
    fn clear_empties_the_bag() {
        let mut kv = KvStore::new();
        kv.set("a", json!("x"));
        kv.set("b", json!(true));
        kv.clear();
        assert!(kv.is_empty());
    }
}
