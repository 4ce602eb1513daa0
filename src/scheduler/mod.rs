//! The virtual-time kernel: clock, event queue, and cooperative processes.
//!
//! Simulations run on a single-threaded cooperative scheduler over a
//! monotonically non-decreasing virtual clock. Pending events are ordered by
//! `(due time, insertion sequence)`, so events due at the same instant
//! execute in the order they were scheduled: the FIFO tie-break every
//! ordering guarantee in the engine rests on.
//!
//! # Process model
//!
//! A [`Process`] is an explicit state machine. Each call to
//! [`Process::resume`] runs one burst of work and returns a [`Step`]:
//! `Yield(effect)`, suspending the process until the scheduler satisfies the
//! [`Effect`], or `Complete`. Only `Timeout` (resume after a fixed number
//! of ticks) and `Seize` (resume once a unit of a capacity-limited server is
//! granted) can hold a process suspended; `Release` resumes at the same
//! instant. Everything a process does between suspension points (graph
//! lookups, registry access, state mutation, logging) runs atomically with
//! respect to all other processes, so component-local state needs no
//! locking.
//!
//! # Servers
//!
//! A [`ServerId`] names a capacity-limited server with an implicit FIFO wait
//! queue. `Seize` grants a unit immediately when one is free and otherwise
//! enqueues the process; `Release` hands the unit to the head waiter or
//! returns it to the pool. The scheduler tracks which process holds which
//! units and releases them automatically when a process completes or when
//! the run is torn down, so every exit path, including user-code failure,
//! keeps the accounting consistent.

mod kernel;
mod process;

pub use kernel::{Scheduler, SchedulerError, ServerId};
pub use process::{Effect, Process, ProcessId, Step, VirtualTime};
