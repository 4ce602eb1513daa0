//! Serde models of the three configuration documents.
//!
//! A project directory holds `dataState.json` (component definitions keyed
//! by component id), `genState.json` (payload type definitions keyed by type
//! name), and `edge.json` (the workflow edge list). Field names follow the
//! on-disk format: camelCase, with the historical capitalised `Runners`,
//! `GenData`, and `Yieldable` keys.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hooks::HookKind;

/// Widget type of a configurable input field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Text,
    Select,
    Checkbox,
    Multiselect,
}

/// One configurable input field of a component.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub input_name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub default_value: Value,
    #[serde(default)]
    pub validation: Option<String>,
    #[serde(default)]
    pub display: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Option<Value>,
}

/// Direction of a connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    In,
    Out,
    Inout,
}

/// A declared connection point of a component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Connector {
    pub id: String,
    pub name: String,
    pub flow: FlowDirection,
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub validation: Option<String>,
}

/// The four user-code fragments a component may carry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HookBundle {
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub generator: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
}

impl HookBundle {
    /// The configured fragment for one hook slot, if any.
    #[must_use]
    pub fn fragment(&self, kind: HookKind) -> Option<&str> {
        let slot = match kind {
            HookKind::Run => &self.run,
            HookKind::Generator => &self.generator,
            HookKind::Model => &self.model,
            HookKind::Event => &self.event,
        };
        slot.as_deref().filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        HookKind::ALL.iter().all(|&k| self.fragment(k).is_none())
    }
}

/// Payload generation settings of a generator-like component.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenData {
    #[serde(default)]
    pub config: Value,
    /// Names of the payload types this component emits.
    #[serde(default)]
    pub types: Option<Vec<String>>,
}

/// One component definition from `dataState.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub type_name: String,
    pub comp_name: String,
    #[serde(default)]
    pub id: Option<String>,
    pub category: String,
    #[serde(default)]
    pub input_data: FxHashMap<String, Value>,
    #[serde(default)]
    pub custom_input: FxHashMap<String, CustomField>,
    #[serde(default)]
    pub connectors: Vec<Connector>,
    #[serde(rename = "Runners", default)]
    pub runners: HookBundle,
    #[serde(rename = "GenData", default)]
    pub gen_data: Option<GenData>,
    #[serde(rename = "Yieldable", default)]
    pub yieldable: Option<bool>,
}

impl ComponentSpec {
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.input_data.get(key)
    }

    pub fn input_int(&self, key: &str) -> Option<i64> {
        self.input_data.get(key).and_then(Value::as_i64)
    }

    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input_data.get(key).and_then(Value::as_str)
    }

    pub fn input_bool(&self, key: &str) -> Option<bool> {
        self.input_data.get(key).and_then(Value::as_bool)
    }

    /// Seed values for the component's key-value bag: each custom input's
    /// default, keyed by field name.
    #[must_use]
    pub fn custom_defaults(&self) -> FxHashMap<String, Value> {
        self.custom_input
            .iter()
            .map(|(name, field)| (name.clone(), field.default_value.clone()))
            .collect()
    }

    /// The payload types this component emits, per its `GenData`.
    #[must_use]
    pub fn declared_types(&self) -> Vec<String> {
        self.gen_data
            .as_ref()
            .and_then(|g| g.types.clone())
            .unwrap_or_default()
    }
}

/// The full component store: `compId -> ComponentSpec`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentStore {
    specs: FxHashMap<String, ComponentSpec>,
}

impl ComponentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, spec: ComponentSpec) {
        self.specs.insert(key.into(), spec);
    }

    pub fn get(&self, key: &str) -> Option<&ComponentSpec> {
        self.specs.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Entries in key order, for deterministic construction.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &ComponentSpec)> {
        let mut entries: Vec<_> = self
            .specs
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
}
