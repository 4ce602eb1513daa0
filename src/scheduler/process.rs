//! Process trait and the effects a process may yield.

use crate::runtime::SimCtx;

use super::kernel::ServerId;

/// Virtual time, in ticks. Advanced only by the scheduler; unrelated to
/// wall-clock time.
pub type VirtualTime = u64;

/// Identifier of a spawned process within one scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcessId(pub usize);

/// A suspension request yielded by a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Resume after exactly this many virtual ticks. Zero re-queues the
    /// process behind events already due now.
    Timeout(VirtualTime),
    /// Resume once one capacity unit of the server is granted, FIFO across
    /// waiters.
    Seize(ServerId),
    /// Return one held unit. The process resumes at the same instant;
    /// releasing a never-held server is a fatal scheduler error.
    Release(ServerId),
}

/// Outcome of one resumption burst.
#[derive(Debug)]
pub enum Step {
    /// Suspend until the effect is satisfied.
    Yield(Effect),
    /// The process is finished; its held server units are auto-released.
    Complete,
}

/// A cooperative process driven by the scheduler.
///
/// Implementations are state machines: each `resume` picks up where the last
/// `Yield` left off. The context gives access to the simulation world
/// (component registry, workflow graph, type registry, event log) and to
/// token dispatch.
pub trait Process {
    fn resume(&mut self, ctx: &mut SimCtx<'_>) -> Step;
}
