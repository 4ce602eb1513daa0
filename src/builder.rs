//! Loads a project's configuration and assembles a runnable simulation.
//!
//! Three documents live at the project path: `dataState.json` (component
//! definitions), `genState.json` (payload type definitions), and `edge.json`
//! (the workflow edge list). [`SimulationBuilder`] parses them, constructs
//! the event log, graph, type registry, and scheduler, then instantiates
//! every component by dispatching its declared `category` against a registry
//! of constructors. All failures here are fatal: nothing has been dispatched
//! yet, so a broken configuration stops the run before the first event.
//!
//! # Examples
//!
//! ```no_run
//! use simflow::builder::SimulationBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sim = SimulationBuilder::new("test_run", "./projects/state", "./projects/run")
//!     .with_run_time(1_000)
//!     .build()?;
//! sim.run()?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::component::{Component, ComponentError, Generator, Registry, Resource};
use crate::config::{ComponentSpec, ComponentStore};
use crate::graph::{Edge, GraphError, WorkflowGraph};
use crate::hooks::HookRegistry;
use crate::log::{CsvSink, EventLog, RowSink};
use crate::payload::GenTypeState;
use crate::runtime::{Simulation, World};
use crate::scheduler::{Scheduler, VirtualTime};

/// Fatal configuration-time failures.
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("failed to read {}", path.display())]
    #[diagnostic(code(simflow::builder::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}", path.display())]
    #[diagnostic(code(simflow::builder::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Component(#[from] ComponentError),

    #[error("component '{component}' declares unregistered category '{category}'")]
    #[diagnostic(
        code(simflow::builder::unregistered_category),
        help("Register a constructor for the category, or fix the component definition.")
    )]
    UnregisteredCategory { category: String, component: String },

    #[error("component '{component}' is missing required input '{field}'")]
    #[diagnostic(code(simflow::builder::missing_input))]
    MissingInput {
        field: &'static str,
        component: String,
    },

    #[error("component '{component}' input '{field}' is invalid: {reason}")]
    #[diagnostic(code(simflow::builder::invalid_input))]
    InvalidInput {
        field: &'static str,
        component: String,
        reason: String,
    },

    #[error("failed to create log sink at {}", path.display())]
    #[diagnostic(code(simflow::builder::log_sink))]
    LogSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Services a component constructor may use while the simulation is
/// assembled: the scheduler (to create servers) and the host's hook registry.
pub struct BuildCtx<'a> {
    pub scheduler: &'a mut Scheduler,
    pub hooks: &'a HookRegistry,
}

/// A component constructor, dispatched by declared category.
pub type ConstructorFn =
    fn(&ComponentSpec, &mut BuildCtx<'_>) -> Result<Box<dyn Component>, BuildError>;

/// The built-in category registry: `generator` and `resource`.
#[must_use]
pub fn built_in_constructors() -> FxHashMap<String, ConstructorFn> {
    let mut constructors: FxHashMap<String, ConstructorFn> = FxHashMap::default();
    constructors.insert("generator".to_string(), Generator::from_spec);
    constructors.insert("resource".to_string(), Resource::from_spec);
    constructors
}

/// Assembles a [`Simulation`] from a project directory (or from already
/// parsed documents via [`build_from_parts`](Self::build_from_parts)).
pub struct SimulationBuilder {
    run_name: String,
    project_path: PathBuf,
    run_path: PathBuf,
    run_time: Option<VirtualTime>,
    constructors: FxHashMap<String, ConstructorFn>,
    hook_registry: HookRegistry,
    extra_sinks: Vec<Box<dyn RowSink>>,
}

impl SimulationBuilder {
    pub fn new(
        run_name: impl Into<String>,
        project_path: impl Into<PathBuf>,
        run_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            run_name: run_name.into(),
            project_path: project_path.into(),
            run_path: run_path.into(),
            run_time: None,
            constructors: built_in_constructors(),
            hook_registry: HookRegistry::new(),
            extra_sinks: Vec::new(),
        }
    }

    /// Bound the run at a virtual instant; unbounded when unset.
    #[must_use]
    pub fn with_run_time(mut self, run_time: VirtualTime) -> Self {
        self.run_time = Some(run_time);
        self
    }

    /// Register a constructor for a component category.
    #[must_use]
    pub fn with_constructor(mut self, category: impl Into<String>, func: ConstructorFn) -> Self {
        self.constructors.insert(category.into(), func);
        self
    }

    /// Replace the hook registry user-code fragments resolve against.
    #[must_use]
    pub fn with_hook_registry(mut self, registry: HookRegistry) -> Self {
        self.hook_registry = registry;
        self
    }

    /// Add a log sink alongside the run's CSV file.
    #[must_use]
    pub fn with_sink<T: RowSink + 'static>(mut self, sink: T) -> Self {
        self.extra_sinks.push(Box::new(sink));
        self
    }

    /// Read the three documents from the project path and assemble the
    /// simulation, logging to `<run_path>/<run_name>.csv`.
    pub fn build(mut self) -> Result<Simulation, BuildError> {
        let store: ComponentStore = read_json(&self.project_path.join("dataState.json"))?;
        let types: GenTypeState = read_json(&self.project_path.join("genState.json"))?;
        let edges: Vec<Edge> = read_json(&self.project_path.join("edge.json"))?;

        let csv_path = self.run_path.join(format!("{}.csv", self.run_name));
        let csv = CsvSink::create(&csv_path, CsvSink::DEFAULT_BUFFER_CAPACITY).map_err(|source| {
            BuildError::LogSink {
                path: csv_path,
                source,
            }
        })?;
        let mut sinks: Vec<Box<dyn RowSink>> = vec![Box::new(csv)];
        sinks.append(&mut self.extra_sinks);

        self.assemble(store, types, edges, sinks)
    }

    /// Assemble from documents already in memory, logging only to the sinks
    /// added with [`with_sink`](Self::with_sink). Used by tests and by hosts
    /// that manage persistence themselves.
    pub fn build_from_parts(
        mut self,
        store: ComponentStore,
        types: GenTypeState,
        edges: Vec<Edge>,
    ) -> Result<Simulation, BuildError> {
        let sinks = std::mem::take(&mut self.extra_sinks);
        self.assemble(store, types, edges, sinks)
    }

    fn assemble(
        self,
        store: ComponentStore,
        types: GenTypeState,
        edges: Vec<Edge>,
        sinks: Vec<Box<dyn RowSink>>,
    ) -> Result<Simulation, BuildError> {
        let graph = WorkflowGraph::from_edges(edges)?;
        let log = EventLog::with_sinks(sinks);
        let mut scheduler = Scheduler::new();
        let mut registry = Registry::new();

        for (_, spec) in store.iter_sorted() {
            let constructor = self.constructors.get(&spec.category).ok_or_else(|| {
                BuildError::UnregisteredCategory {
                    category: spec.category.clone(),
                    component: spec.comp_name.clone(),
                }
            })?;
            let component = constructor(
                spec,
                &mut BuildCtx {
                    scheduler: &mut scheduler,
                    hooks: &self.hook_registry,
                },
            )?;
            registry.insert(component)?;
        }

        let world = World::new(registry, graph, types, log);
        Ok(Simulation::new(scheduler, world, self.run_time))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BuildError> {
    let raw = std::fs::read_to_string(path).map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| BuildError::Json {
        path: path.to_path_buf(),
        source,
    })
}
