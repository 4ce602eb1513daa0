//! Component lifecycle, registry, and the shared component core.
//!
//! A component is a node in the workflow graph with a cooperative `run`
//! procedure. Concrete kinds (the built-in [`Generator`] and [`Resource`],
//! or host-defined ones) wrap a [`ComponentCore`] carrying everything common
//! to all kinds: identity, declared payload types, the key-value bag, the
//! action vocabulary, invocation counters, and the resolved user-code hooks.
//!
//! Components live in the [`Registry`], which owns them by id for the whole
//! simulation; processes refer back to their component by id and borrow it
//! through the [`SimCtx`](crate::runtime::SimCtx) between suspension points.

mod generator;
mod resource;

pub use generator::Generator;
pub use resource::Resource;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::ComponentSpec;
use crate::hooks::{HookKind, HookOutcome, HookSet};
use crate::kv::KvStore;
use crate::log::LogRow;
use crate::payload::GenContainer;
use crate::scheduler::{Process, VirtualTime};

/// Invocation counters every component maintains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// Incremented at the entry of every `run` activation.
    pub run_calls: u64,
    /// Incremented once per delivered input.
    pub inputs: u64,
}

/// State common to every component kind.
#[derive(Debug)]
pub struct ComponentCore {
    pub comp_id: String,
    pub comp_name: String,
    pub type_name: String,
    pub category: String,
    /// Payload types this component emits (from its `GenData`).
    pub gen_types: Vec<String>,
    pub kv: KvStore,
    actions: Vec<String>,
    pub counters: Counters,
    pub hooks: HookSet,
}

impl ComponentCore {
    /// Build a core from a parsed spec. The spec must carry an id.
    pub fn from_spec(spec: &ComponentSpec, hooks: HookSet) -> Result<Self, ComponentError> {
        let comp_id = spec
            .id
            .clone()
            .ok_or_else(|| ComponentError::MissingId(spec.comp_name.clone()))?;
        Ok(Self {
            comp_id,
            comp_name: spec.comp_name.clone(),
            type_name: spec.type_name.clone(),
            category: spec.category.clone(),
            gen_types: spec.declared_types(),
            kv: KvStore::from_map(spec.custom_defaults()),
            actions: Vec::new(),
            counters: Counters::default(),
            hooks,
        })
    }

    pub fn set_actions<I, S>(&mut self, actions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
    }

    pub fn insert_action(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }

    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    #[must_use]
    pub fn has_action(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    /// The standard `values` column payload: current counters.
    #[must_use]
    pub fn counter_values(&self) -> Value {
        json!({
            "input_count": self.counters.inputs,
            "run_count": self.counters.run_calls,
        })
    }

    /// Build a log row for this component at the given instant.
    #[must_use]
    pub fn make_row(
        &self,
        time: VirtualTime,
        action: &str,
        values: Value,
        pdv: Option<GenContainer>,
        addition: Option<Value>,
    ) -> LogRow {
        LogRow {
            time,
            component_id: self.comp_id.clone(),
            component_type: self.category.clone(),
            action: action.to_string(),
            values,
            pdv,
            addition,
        }
    }

    /// Invoke one hook slot, containing any user-code error.
    ///
    /// A missing hook yields [`HookOutcome::Missing`] so the caller applies
    /// its default; a failing hook is reported on the diagnostic channel and
    /// yields [`HookOutcome::Failed`].
    pub fn run_hook(&mut self, kind: HookKind, input: Option<&GenContainer>) -> HookOutcome {
        let Some(hook) = self.hooks.get(kind).cloned() else {
            return HookOutcome::Missing;
        };
        match hook.call(self, input) {
            Ok(flow) => HookOutcome::Flow(flow),
            Err(err) => {
                tracing::warn!(
                    target: "simflow::hooks",
                    component = %self.comp_id,
                    hook = %kind,
                    fragment = hook.name(),
                    error = %err,
                    "user-code-error: hook result discarded"
                );
                HookOutcome::Failed
            }
        }
    }
}

/// A node in the workflow graph with a cooperative `run` procedure.
///
/// `activate` builds the process the scheduler drives for one delivery;
/// all mutable per-component state lives in the core and is reached through
/// the simulation context while the process runs.
pub trait Component: Send {
    fn core(&self) -> &ComponentCore;
    fn core_mut(&mut self) -> &mut ComponentCore;
    fn activate(&self, input: Option<GenContainer>) -> Box<dyn Process>;
}

/// Errors raised while assembling or registering components.
#[derive(Debug, Error, Diagnostic)]
pub enum ComponentError {
    #[error("component '{0}' has no id")]
    #[diagnostic(code(simflow::component::missing_id))]
    MissingId(String),

    #[error("component id '{0}' already registered")]
    #[diagnostic(code(simflow::component::duplicate_id))]
    DuplicateId(String),
}

/// Process-wide component registry: the sole owner of every instance,
/// keyed by component id, alive until the simulation ends.
#[derive(Default)]
pub struct Registry {
    components: FxHashMap<String, Box<dyn Component>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: Box<dyn Component>) -> Result<(), ComponentError> {
        let id = component.core().comp_id.clone();
        if self.components.contains_key(&id) {
            return Err(ComponentError::DuplicateId(id));
        }
        self.components.insert(id, component);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn Component> {
        self.components.get(id).map(Box::as_ref)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn Component + 'static)> {
        self.components.get_mut(id).map(Box::as_mut)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
