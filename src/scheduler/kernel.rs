//! The scheduler proper: event heap, virtual clock, and servers.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::runtime::{SimCtx, World};

use super::process::{Effect, Process, ProcessId, Step, VirtualTime};

/// Identifier of a capacity-limited server within one scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServerId(pub(crate) usize);

/// Fatal scheduler failures. Configuration errors and invariant violations
/// stop the run; nothing here is retried.
#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    /// A delay from configuration or user code was negative.
    #[error("invalid delay: {0} (delays must be >= 0 virtual ticks)")]
    #[diagnostic(code(simflow::scheduler::invalid_delay))]
    InvalidDelay(i64),

    /// A process released a server unit it never held.
    #[error("process {process} released server {server} without holding a unit")]
    #[diagnostic(
        code(simflow::scheduler::release_without_seize),
        help("Every Release must pair with an earlier granted Seize of the same server.")
    )]
    ReleaseWithoutSeize { process: usize, server: usize },

    /// An effect referenced a server id this scheduler never created.
    #[error("unknown server id {0}")]
    #[diagnostic(code(simflow::scheduler::unknown_server))]
    UnknownServer(usize),
}

/// An entry in the pending-event heap, ordered by `(due, seq)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Pending {
    due: VirtualTime,
    seq: u64,
    pid: usize,
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A capacity-limited server with a FIFO wait queue.
#[derive(Debug)]
struct Server {
    capacity: usize,
    in_service: usize,
    waiters: VecDeque<usize>,
}

/// Single-threaded cooperative scheduler over a virtual clock.
///
/// See the [module docs](super) for the execution model.
#[derive(Default)]
pub struct Scheduler {
    now: VirtualTime,
    seq: u64,
    queue: BinaryHeap<Reverse<Pending>>,
    processes: Vec<Option<Box<dyn Process>>>,
    servers: Vec<Server>,
    /// Server units currently held, per live process.
    held: FxHashMap<usize, Vec<usize>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> VirtualTime {
        self.now
    }

    /// Validate a signed delay from configuration or user code.
    pub fn delay_from(delay: i64) -> Result<VirtualTime, SchedulerError> {
        VirtualTime::try_from(delay).map_err(|_| SchedulerError::InvalidDelay(delay))
    }

    /// Create a capacity-limited server. Capacity must be at least 1; the
    /// builder validates this before construction.
    pub fn create_server(&mut self, capacity: usize) -> ServerId {
        debug_assert!(capacity >= 1, "server capacity must be >= 1");
        let id = self.servers.len();
        self.servers.push(Server {
            capacity: capacity.max(1),
            in_service: 0,
            waiters: VecDeque::new(),
        });
        ServerId(id)
    }

    /// Register a process ready to resume at the current instant.
    pub fn spawn(&mut self, process: Box<dyn Process>) -> ProcessId {
        let pid = self.processes.len();
        self.processes.push(Some(process));
        self.schedule_at(self.now, pid);
        ProcessId(pid)
    }

    fn schedule_at(&mut self, due: VirtualTime, pid: usize) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Pending { due, seq, pid }));
    }

    /// Number of events still pending.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Units of a server currently in service.
    #[must_use]
    pub fn in_service(&self, server: ServerId) -> usize {
        self.servers[server.0].in_service
    }

    /// Capacity of a server.
    #[must_use]
    pub fn capacity(&self, server: ServerId) -> usize {
        self.servers[server.0].capacity
    }

    /// Processes queued waiting on a server.
    #[must_use]
    pub fn queued(&self, server: ServerId) -> usize {
        self.servers[server.0].waiters.len()
    }

    /// Drive the queue until it is empty or the clock reaches `until`.
    ///
    /// Events due at or past `until` are discarded and `now` lands exactly on
    /// the bound. On return, server units still held by unfinished processes
    /// have been released (scoped-release teardown).
    pub fn run(&mut self, world: &mut World, until: Option<VirtualTime>) -> Result<(), SchedulerError> {
        let result = self.drive(world, until);
        self.teardown();
        result
    }

    fn drive(&mut self, world: &mut World, until: Option<VirtualTime>) -> Result<(), SchedulerError> {
        while let Some(Reverse(pending)) = self.queue.pop() {
            if let Some(bound) = until {
                if pending.due >= bound {
                    self.now = bound.max(self.now);
                    self.queue.clear();
                    break;
                }
            }
            debug_assert!(pending.due >= self.now, "virtual time must not go backwards");
            self.now = pending.due;

            let Some(mut process) = self.processes[pending.pid].take() else {
                continue;
            };

            let mut ctx = SimCtx::new(self.now, world);
            let step = process.resume(&mut ctx);

            // Children spawned during the step are scheduled before the
            // parent's own reschedule, so a spawner observes its successor's
            // first step only after its next suspension.
            for child in ctx.into_spawned() {
                self.spawn(child);
            }

            match step {
                Step::Yield(effect) => {
                    self.processes[pending.pid] = Some(process);
                    self.apply_effect(pending.pid, effect)?;
                }
                Step::Complete => {
                    self.finish(pending.pid);
                }
            }
        }
        Ok(())
    }

    fn apply_effect(&mut self, pid: usize, effect: Effect) -> Result<(), SchedulerError> {
        match effect {
            Effect::Timeout(delay) => {
                self.schedule_at(self.now + delay, pid);
            }
            Effect::Seize(server) => {
                let slot = self
                    .servers
                    .get_mut(server.0)
                    .ok_or(SchedulerError::UnknownServer(server.0))?;
                if slot.in_service < slot.capacity {
                    slot.in_service += 1;
                    self.held.entry(pid).or_default().push(server.0);
                    self.schedule_at(self.now, pid);
                } else {
                    slot.waiters.push_back(pid);
                }
            }
            Effect::Release(server) => {
                if self.servers.get(server.0).is_none() {
                    return Err(SchedulerError::UnknownServer(server.0));
                }
                self.release_unit(pid, server.0)?;
                self.schedule_at(self.now, pid);
            }
        }
        Ok(())
    }

    /// Return one unit held by `pid`: hand it to the head waiter or put it
    /// back in the pool.
    fn release_unit(&mut self, pid: usize, server: usize) -> Result<(), SchedulerError> {
        let held = self.held.get_mut(&pid);
        let position = held
            .as_ref()
            .and_then(|units| units.iter().position(|&s| s == server));
        let Some(position) = position else {
            return Err(SchedulerError::ReleaseWithoutSeize {
                process: pid,
                server,
            });
        };
        held.expect("held entry present").swap_remove(position);

        let slot = &mut self.servers[server];
        if let Some(waiter) = slot.waiters.pop_front() {
            // The unit transfers without touching in_service.
            self.held.entry(waiter).or_default().push(server);
            self.schedule_at(self.now, waiter);
        } else {
            slot.in_service -= 1;
        }
        Ok(())
    }

    /// Release everything a completed process still holds.
    fn finish(&mut self, pid: usize) {
        if let Some(units) = self.held.remove(&pid) {
            for server in units {
                let slot = &mut self.servers[server];
                if let Some(waiter) = slot.waiters.pop_front() {
                    self.held.entry(waiter).or_default().push(server);
                    self.schedule_at(self.now, waiter);
                } else {
                    slot.in_service -= 1;
                }
            }
        }
        self.processes[pid] = None;
    }

    /// Release units held by processes left pending at termination.
    fn teardown(&mut self) {
        for (_, units) in self.held.drain() {
            for server in units {
                let slot = &mut self.servers[server];
                slot.in_service = slot.in_service.saturating_sub(1);
            }
        }
        for slot in &mut self.servers {
            slot.waiters.clear();
        }
    }
}
