//! # Simflow: Virtual-Time Workflow Simulation Engine
//!
//! Simflow is a discrete-event simulation engine driven by a user-defined
//! directed workflow graph. Components (generators, capacity-limited
//! resources, arbitrary processing stages) exchange typed token containers
//! along graph edges under a single-threaded cooperative scheduler that
//! advances a virtual clock. A configured topology runs to a bound and
//! produces a timestamped, fixed-column event log.
//!
//! ## Core Concepts
//!
//! - **Scheduler**: a virtual clock with a `(due, insertion)`-ordered event
//!   queue; only `timeout` and `seize` suspend, so everything between
//!   suspension points runs atomically
//! - **Components**: graph nodes with a cooperative `run` procedure and
//!   per-instance state
//! - **Containers**: in-flight messages carrying typed payloads plus the
//!   routing fields the dispatch protocol rewrites at each hop
//! - **Graph**: handle-directed routing keyed by `(source, sourceHandle)`
//! - **Log**: an append-only structured sink shared by every component
//!
//! ## Quick Start
//!
//! Topologies are usually loaded from a project directory via
//! [`builder::SimulationBuilder`]; the `demos/` directory shows a complete
//! generator-to-resource run. The short version:
//!
//! ```no_run
//! use simflow::builder::SimulationBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sim = SimulationBuilder::new("smoke", "./project", "./runs")
//!     .with_run_time(100)
//!     .build()?;
//! sim.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`scheduler`] - Virtual clock, event queue, processes, and servers
//! - [`graph`] - Workflow topology and handle-directed routing
//! - [`payload`] - Payload schemas, the type registry, and token containers
//! - [`component`] - Component lifecycle, registry, and built-in kinds
//! - [`hooks`] - The user-code bridge
//! - [`kv`] - Per-component key-value state
//! - [`log`] - Structured event logging and sinks
//! - [`config`] - The three configuration documents
//! - [`builder`] - Project loading and simulation assembly
//! - [`runtime`] - The assembled simulation and dispatch context

pub mod builder;
pub mod component;
pub mod config;
pub mod graph;
pub mod hooks;
pub mod kv;
pub mod log;
pub mod payload;
pub mod runtime;
pub mod scheduler;
pub mod telemetry;
