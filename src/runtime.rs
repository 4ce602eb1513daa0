//! Shared simulation state and the token dispatch protocol.
//!
//! The original ambient globals (type registry, workflow graph, logger) are
//! replaced by an explicit [`World`] owned by the [`Simulation`] and lent to
//! processes through [`SimCtx`] for the duration of one resumption burst.
//! Because only one process runs between suspension points, the context can
//! hand out mutable access to the registry and type state without locks.

use miette::Diagnostic;
use thiserror::Error;

use crate::component::Registry;
use crate::graph::WorkflowGraph;
use crate::log::{EventLog, LogRow};
use crate::payload::{GenContainer, GenTypeState};
use crate::scheduler::{Process, Scheduler, SchedulerError, VirtualTime};

/// Everything a process may touch between suspension points.
pub struct World {
    pub registry: Registry,
    pub graph: WorkflowGraph,
    pub types: GenTypeState,
    pub log: EventLog,
    container_seq: u64,
}

impl World {
    #[must_use]
    pub fn new(registry: Registry, graph: WorkflowGraph, types: GenTypeState, log: EventLog) -> Self {
        Self {
            registry,
            graph,
            types,
            log,
            container_seq: 0,
        }
    }

    /// Next unique container id. A deterministic sequence, so identical runs
    /// produce identical logs.
    pub fn next_container_id(&mut self) -> u64 {
        self.container_seq += 1;
        self.container_seq
    }
}

/// Execution context passed to a process for one resumption burst.
pub struct SimCtx<'w> {
    now: VirtualTime,
    pub world: &'w mut World,
    spawned: Vec<Box<dyn Process>>,
}

impl<'w> SimCtx<'w> {
    pub(crate) fn new(now: VirtualTime, world: &'w mut World) -> Self {
        Self {
            now,
            world,
            spawned: Vec::new(),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Register a process ready to resume at the current instant, once this
    /// burst's own suspension is recorded.
    pub fn spawn(&mut self, process: Box<dyn Process>) {
        self.spawned.push(process);
    }

    pub(crate) fn into_spawned(self) -> Vec<Box<dyn Process>> {
        self.spawned
    }

    /// Append a row to the event log at the current instant.
    pub fn log(&mut self, row: LogRow) {
        debug_assert!(row.time <= self.now);
        self.world.log.log_event(&row);
    }

    /// Hand a token onward: the `_next` step of the component protocol.
    ///
    /// 1. No output: nothing to forward.
    /// 2. Unset `target_comp`: the emitter inherits its own id as source.
    /// 3. Unset `target_handler`: derive the single-payload default
    ///    (`"T-out"`); ambiguous tokens are dropped.
    /// 4. Resolve the route; no edge means the token is dropped with a
    ///    `route-missing` diagnostic and the emitter continues.
    /// 5. Rewrite the container's target pair to the resolved destination.
    /// 6. Spawn the destination component's `run` with the token; an absent
    ///    destination drops the token with a `registry-miss` diagnostic.
    pub fn dispatch(&mut self, emitter: &str, output: Option<GenContainer>) {
        let Some(mut output) = output else {
            return;
        };

        if output.target_comp.is_none() {
            output.target_comp = Some(emitter.to_string());
        }
        if output.target_handler.is_none() {
            match output.default_handler() {
                Some(handler) => output.target_handler = Some(handler),
                None => {
                    tracing::debug!(
                        target: "simflow::dispatch",
                        component = emitter,
                        container = output.container_id,
                        payloads = output.data.len(),
                        "no unambiguous outbound handle; token dropped"
                    );
                    return;
                }
            }
        }

        let source = output.target_comp.clone().expect("source set above");
        let source_handle = output.target_handler.clone().expect("handle set above");

        let Some((target, target_handle)) = self.world.graph.route_from(&source, &source_handle)
        else {
            tracing::warn!(
                target: "simflow::dispatch",
                component = %source,
                handle = %source_handle,
                container = output.container_id,
                "route-missing: token dropped"
            );
            return;
        };
        let (target, target_handle) = (target.to_string(), target_handle.to_string());
        output.set_next_target(&target, &target_handle);

        let Some(destination) = self.world.registry.get(&target) else {
            tracing::warn!(
                target: "simflow::dispatch",
                component = %target,
                container = output.container_id,
                "registry-miss: token dropped"
            );
            return;
        };
        let process = destination.activate(Some(output));
        self.spawn(process);
    }
}

/// Errors surfaced while running an assembled simulation.
#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    /// A workflow root has no component instance backing it.
    #[error("root component '{0}' not found in the registry")]
    #[diagnostic(
        code(simflow::runtime::missing_root),
        help("Every node with in-degree 0 must appear in the component store.")
    )]
    MissingRootComponent(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// An assembled simulation: scheduler plus world, ready to run.
pub struct Simulation {
    scheduler: Scheduler,
    world: World,
    run_time: Option<VirtualTime>,
    started: bool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("run_time", &self.run_time)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    #[must_use]
    pub fn new(scheduler: Scheduler, world: World, run_time: Option<VirtualTime>) -> Self {
        Self {
            scheduler,
            world,
            run_time,
            started: false,
        }
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> VirtualTime {
        self.scheduler.now()
    }

    /// Spawn every root component's `run` and drive the scheduler to the
    /// configured bound (or until the queue drains).
    ///
    /// Roots are components with no incoming edges, including components
    /// that appear in no edge at all. The log is flushed before returning.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        if !self.started {
            self.started = true;

            for root in self.world.graph.roots() {
                if !self.world.registry.contains(root) {
                    return Err(RuntimeError::MissingRootComponent(root.to_string()));
                }
            }

            let mut roots: Vec<String> = self
                .world
                .registry
                .ids()
                .filter(|id| self.world.graph.incoming(id).is_empty())
                .map(str::to_string)
                .collect();
            roots.sort_unstable();

            for id in roots {
                let process = self
                    .world
                    .registry
                    .get(&id)
                    .expect("root id from registry")
                    .activate(None);
                self.scheduler.spawn(process);
            }
        }

        let result = self.scheduler.run(&mut self.world, self.run_time);
        self.world.log.flush();
        result.map_err(RuntimeError::from)
    }
}
