//! The built-in capacity-limited resource.

use std::collections::VecDeque;

use serde_json::Value;

use crate::builder::{BuildCtx, BuildError};
use crate::config::ComponentSpec;
use crate::graph::rotate_out;
use crate::hooks::{HookKind, HookOutcome, HookSet};
use crate::payload::GenContainer;
use crate::runtime::SimCtx;
use crate::scheduler::{Effect, Process, ServerId, Step};

use super::{Component, ComponentCore};

/// A serving station with integer capacity and an implicit FIFO wait queue.
///
/// Every delivered token seizes one capacity unit (waiting its turn when the
/// station is saturated), is serviced (by the `run` hook when configured,
/// otherwise a one-tick hold), and leaves on the outbound side of the handle
/// it arrived on. `ENTER` is logged when the unit is granted and `EXIT` once
/// it is returned; a user-code failure during service drops the token after
/// release, so capacity accounting stays consistent on every path.
pub struct Resource {
    core: ComponentCore,
    capacity: usize,
    server: ServerId,
}

impl Resource {
    pub const DEFAULT_ACTIONS: [&'static str; 3] = ["ENTER", "EXIT", "PROCESSING"];

    /// Constructor used by the builder's category registry.
    pub fn from_spec(
        spec: &ComponentSpec,
        ctx: &mut BuildCtx<'_>,
    ) -> Result<Box<dyn Component>, BuildError> {
        let capacity = spec
            .input("capacity")
            .ok_or_else(|| BuildError::MissingInput {
                field: "capacity",
                component: spec.comp_name.clone(),
            })?;
        let capacity = capacity
            .as_i64()
            .ok_or_else(|| BuildError::InvalidInput {
                field: "capacity",
                component: spec.comp_name.clone(),
                reason: "must be an integer".to_string(),
            })?;
        if capacity < 1 {
            return Err(BuildError::InvalidInput {
                field: "capacity",
                component: spec.comp_name.clone(),
                reason: format!("must be >= 1, got {capacity}"),
            });
        }

        let hooks = HookSet::from_bundle(&spec.comp_name, &spec.runners, ctx.hooks);
        let mut core = ComponentCore::from_spec(spec, hooks)?;
        core.set_actions(Self::DEFAULT_ACTIONS);
        let capacity = capacity as usize;
        let server = ctx.scheduler.create_server(capacity);
        Ok(Box::new(Self {
            core,
            capacity,
            server,
        }))
    }

    /// Assemble directly, for hosts building topologies in code. The server
    /// must have been created on the scheduler driving this simulation.
    #[must_use]
    pub fn new(core: ComponentCore, capacity: usize, server: ServerId) -> Self {
        Self {
            core,
            capacity,
            server,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn server(&self) -> ServerId {
        self.server
    }
}

impl Component for Resource {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn activate(&self, input: Option<GenContainer>) -> Box<dyn Process> {
        Box::new(ResourceProcess {
            comp_id: self.core.comp_id.clone(),
            server: self.server,
            input,
            entered: None,
            steps: VecDeque::new(),
            output: None,
            phase: Phase::Start,
            values: Value::Null,
        })
    }
}

enum Phase {
    /// Count the delivery and request a capacity unit.
    Start,
    /// Unit granted: log ENTER and start the service flow.
    Granted,
    /// Draining service suspensions, then returning the unit.
    Service,
    /// Unit returned: log EXIT, rotate the handle, forward.
    Released,
}

struct ResourceProcess {
    comp_id: String,
    server: ServerId,
    input: Option<GenContainer>,
    /// Snapshot of the token as it entered, for the EXIT row.
    entered: Option<GenContainer>,
    steps: VecDeque<Effect>,
    output: Option<GenContainer>,
    phase: Phase,
    values: Value,
}

impl Process for ResourceProcess {
    fn resume(&mut self, ctx: &mut SimCtx<'_>) -> Step {
        loop {
            match self.phase {
                Phase::Start => {
                    let Some(component) = ctx.world.registry.get_mut(&self.comp_id) else {
                        return Step::Complete;
                    };
                    let core = component.core_mut();
                    core.counters.run_calls += 1;
                    if self.input.is_some() {
                        core.counters.inputs += 1;
                    }
                    self.values = core.counter_values();
                    self.phase = Phase::Granted;
                    return Step::Yield(Effect::Seize(self.server));
                }
                Phase::Granted => {
                    self.entered = self.input.clone();
                    let now = ctx.now();
                    let (row, outcome) = {
                        let Some(component) = ctx.world.registry.get_mut(&self.comp_id) else {
                            return Step::Complete;
                        };
                        let row = component.core().make_row(
                            now,
                            "ENTER",
                            self.values.clone(),
                            self.entered.clone(),
                            None,
                        );
                        let outcome = component.core_mut().run_hook(HookKind::Run, self.input.as_ref());
                        (row, outcome)
                    };
                    ctx.log(row);
                    match outcome {
                        HookOutcome::Missing => {
                            // Default service: hold the unit one tick and
                            // pass the token through unchanged.
                            self.steps = VecDeque::from([Effect::Timeout(1)]);
                            self.output = self.input.take();
                        }
                        HookOutcome::Flow(flow) => {
                            self.steps = flow.steps.into();
                            self.output = flow.output;
                        }
                        HookOutcome::Failed => {
                            self.steps.clear();
                            self.output = None;
                        }
                    }
                    self.phase = Phase::Service;
                }
                Phase::Service => {
                    if let Some(effect) = self.steps.pop_front() {
                        return Step::Yield(effect);
                    }
                    self.phase = Phase::Released;
                    return Step::Yield(Effect::Release(self.server));
                }
                Phase::Released => {
                    let now = ctx.now();
                    let row = ctx.world.registry.get(&self.comp_id).map(|component| {
                        component.core().make_row(
                            now,
                            "EXIT",
                            self.values.clone(),
                            self.entered.take(),
                            None,
                        )
                    });
                    if let Some(row) = row {
                        ctx.log(row);
                    }

                    if let Some(mut output) = self.output.take() {
                        // A token that arrived on "<x>-in" leaves on the
                        // symmetric "<x>-out" side of the same channel.
                        if let Some(handler) = output.target_handler.take() {
                            output.target_handler = Some(rotate_out(&handler));
                        }
                        ctx.dispatch(&self.comp_id, Some(output));
                    }
                    return Step::Complete;
                }
            }
        }
    }
}
