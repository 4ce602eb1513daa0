//! The user-code bridge.
//!
//! A component carries up to four hook slots (`run`, `generator`, `model`,
//! `event`), each expected to provide a callable with a fixed entry-point
//! name and the standard signature `(component, input) -> flow`. The core
//! treats user code as opaque: the host registers named implementations in a
//! [`HookRegistry`] ahead of time, and a component's configured fragments
//! are resolved against that registry at load.
//!
//! A fragment that resolves to nothing disables only that hook; it is
//! reported, never fatal. At call time a missing hook yields
//! [`HookOutcome::Missing`] so the host component falls back to its default
//! behaviour, and a hook that returns an error is caught at the bridge,
//! logged as a user-code error, and surfaced as [`HookOutcome::Failed`];
//! the host decides whether that drops the token.
//!
//! A hook's result is a [`HookFlow`]: a finite sequence of suspension
//! requests (driven through the scheduler by the host process) terminated by
//! a single optional output container.

use std::fmt;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::component::ComponentCore;
use crate::config::HookBundle;
use crate::payload::GenContainer;
use crate::scheduler::Effect;

/// The four hook slots of a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    Run,
    Generator,
    Model,
    Event,
}

impl HookKind {
    pub const ALL: [HookKind; 4] = [
        HookKind::Run,
        HookKind::Generator,
        HookKind::Model,
        HookKind::Event,
    ];

    /// The entry-point name user code must define for this slot.
    #[must_use]
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Generator => "generate_data",
            Self::Model => "process_model",
            Self::Event => "handle_event",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

/// What a hook hands back: suspensions to drive, then one result value.
#[derive(Clone, Debug, Default)]
pub struct HookFlow {
    pub steps: Vec<Effect>,
    pub output: Option<GenContainer>,
}

impl HookFlow {
    /// A flow with no suspensions.
    #[must_use]
    pub fn immediate(output: Option<GenContainer>) -> Self {
        Self {
            steps: Vec::new(),
            output,
        }
    }

    /// A flow that suspends through `steps` before yielding `output`.
    #[must_use]
    pub fn with_steps(steps: Vec<Effect>, output: Option<GenContainer>) -> Self {
        Self { steps, output }
    }
}

/// Error raised inside user code. Caught at the bridge, never propagated
/// into the scheduler.
#[derive(Debug, Error, Diagnostic)]
pub enum HookError {
    #[error("{0}")]
    #[diagnostic(code(simflow::hooks::user_code))]
    Failed(String),
}

impl HookError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Standard hook signature: mutable access to the host component's core plus
/// the delivered input, producing a flow.
pub type HookFn =
    dyn Fn(&mut ComponentCore, Option<&GenContainer>) -> Result<HookFlow, HookError> + Send + Sync;

/// A resolved hook: the fragment name it came from plus the callable.
#[derive(Clone)]
pub struct Hook {
    name: String,
    func: Arc<HookFn>,
}

impl Hook {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(
        &self,
        core: &mut ComponentCore,
        input: Option<&GenContainer>,
    ) -> Result<HookFlow, HookError> {
        (self.func)(core, input)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("name", &self.name).finish()
    }
}

/// Host-registered hook implementations, keyed by fragment name.
#[derive(Clone, Default)]
pub struct HookRegistry {
    entries: FxHashMap<String, Arc<HookFn>>,
}

impl HookRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&mut ComponentCore, Option<&GenContainer>) -> Result<HookFlow, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.entries.insert(name.into(), Arc::new(func));
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<HookFn>> {
        self.entries.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Outcome of invoking one hook slot.
#[derive(Debug)]
pub enum HookOutcome {
    /// No hook configured (or the fragment was disabled at load); the host
    /// applies its default behaviour.
    Missing,
    /// The hook ran and produced a flow.
    Flow(HookFlow),
    /// The hook raised; the error was logged and the result is `none`.
    Failed,
}

/// The resolved hook slots of one component.
#[derive(Clone, Debug, Default)]
pub struct HookSet {
    hooks: FxHashMap<HookKind, Hook>,
}

impl HookSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a config bundle against the registry.
    ///
    /// Fragments that do not resolve are reported and skipped: a malformed
    /// hook disables itself, not the component.
    #[must_use]
    pub fn from_bundle(component: &str, bundle: &HookBundle, registry: &HookRegistry) -> Self {
        let mut set = Self::new();
        for kind in HookKind::ALL {
            let Some(fragment) = bundle.fragment(kind) else {
                continue;
            };
            match registry.resolve(fragment) {
                Some(func) => {
                    set.hooks.insert(
                        kind,
                        Hook {
                            name: fragment.to_string(),
                            func,
                        },
                    );
                }
                None => {
                    tracing::warn!(
                        target: "simflow::hooks",
                        component,
                        hook = %kind,
                        fragment,
                        "hook fragment did not resolve; hook disabled"
                    );
                }
            }
        }
        set
    }

    /// Install a hook directly; used by hosts assembling components in code.
    pub fn insert<F>(&mut self, kind: HookKind, name: impl Into<String>, func: F)
    where
        F: Fn(&mut ComponentCore, Option<&GenContainer>) -> Result<HookFlow, HookError>
            + Send
            + Sync
            + 'static,
    {
        self.hooks.insert(
            kind,
            Hook {
                name: name.into(),
                func: Arc::new(func),
            },
        );
    }

    #[must_use]
    pub fn get(&self, kind: HookKind) -> Option<&Hook> {
        self.hooks.get(&kind)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
