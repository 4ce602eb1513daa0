//! The built-in token generator.

use std::collections::VecDeque;

use serde_json::Value;

use crate::builder::{BuildCtx, BuildError};
use crate::config::ComponentSpec;
use crate::hooks::{HookKind, HookOutcome, HookSet};
use crate::payload::GenContainer;
use crate::runtime::SimCtx;
use crate::scheduler::{Effect, Process, Step};

use super::{Component, ComponentCore};

/// Emits token containers populated with the component's declared payload
/// types, once per tick, bounded by the optional `gen_count` input.
///
/// Each iteration suspends for one tick, then builds a container (via the
/// `generator` hook when one is configured, otherwise by cloning the
/// declared types from the shared registry), logs a `GENERATE` row with the
/// container as PDV, and hands it onward.
pub struct Generator {
    core: ComponentCore,
    gen_count: Option<u64>,
}

impl Generator {
    pub const DEFAULT_ACTIONS: [&'static str; 1] = ["GENERATE"];

    /// Constructor used by the builder's category registry.
    pub fn from_spec(
        spec: &ComponentSpec,
        ctx: &mut BuildCtx<'_>,
    ) -> Result<Box<dyn Component>, BuildError> {
        let hooks = HookSet::from_bundle(&spec.comp_name, &spec.runners, ctx.hooks);
        let mut core = ComponentCore::from_spec(spec, hooks)?;
        core.set_actions(Self::DEFAULT_ACTIONS);
        // A non-integer gen_count means unbounded, as does an absent one.
        let gen_count = spec.input_int("gen_count").map(|n| n.max(0) as u64);
        Ok(Box::new(Self { core, gen_count }))
    }

    /// Assemble directly, for hosts building topologies in code.
    #[must_use]
    pub fn new(core: ComponentCore, gen_count: Option<u64>) -> Self {
        Self { core, gen_count }
    }
}

impl Component for Generator {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn activate(&self, _input: Option<GenContainer>) -> Box<dyn Process> {
        Box::new(GeneratorProcess {
            comp_id: self.core.comp_id.clone(),
            gen_types: self.core.gen_types.clone(),
            remaining: self.gen_count,
            emitted: 0,
            phase: Phase::Idle,
            steps: VecDeque::new(),
            pending: None,
            values: Value::Null,
        })
    }
}

enum Phase {
    /// Between iterations; next step is the per-iteration suspension.
    Idle,
    /// The tick fired; count, build the container, start the hook flow.
    Woken,
    /// Draining hook suspensions, then emitting.
    Emitting,
}

struct GeneratorProcess {
    comp_id: String,
    gen_types: Vec<String>,
    remaining: Option<u64>,
    emitted: u64,
    phase: Phase,
    steps: VecDeque<Effect>,
    pending: Option<GenContainer>,
    values: Value,
}

impl GeneratorProcess {
    /// Default container build: clone each declared payload type from the
    /// shared registry.
    fn build_default(&self, ctx: &mut SimCtx<'_>) -> GenContainer {
        let mut container = GenContainer::new(ctx.world.next_container_id());
        for type_name in &self.gen_types {
            match ctx.world.types.get(type_name) {
                Some(gen_type) => {
                    if container.insert(gen_type.clone()).is_err() {
                        tracing::warn!(
                            target: "simflow::component",
                            component = %self.comp_id,
                            payload = %type_name,
                            "payload type declared twice; duplicate skipped"
                        );
                    }
                }
                None => {
                    tracing::warn!(
                        target: "simflow::component",
                        component = %self.comp_id,
                        payload = %type_name,
                        "declared payload type is not registered; skipped"
                    );
                }
            }
        }
        container
    }
}

impl Process for GeneratorProcess {
    fn resume(&mut self, ctx: &mut SimCtx<'_>) -> Step {
        loop {
            match self.phase {
                Phase::Idle => {
                    if self.remaining == Some(0) {
                        return Step::Complete;
                    }
                    self.phase = Phase::Woken;
                    return Step::Yield(Effect::Timeout(1));
                }
                Phase::Woken => {
                    let outcome = {
                        let Some(component) = ctx.world.registry.get_mut(&self.comp_id) else {
                            return Step::Complete;
                        };
                        let core = component.core_mut();
                        core.counters.run_calls += 1;
                        core.counters.inputs += 1;
                        self.values = core.counter_values();
                        core.run_hook(HookKind::Generator, None)
                    };
                    match outcome {
                        HookOutcome::Missing => {
                            self.steps.clear();
                            self.pending = Some(self.build_default(ctx));
                        }
                        HookOutcome::Flow(flow) => {
                            self.steps = flow.steps.into();
                            self.pending = flow.output;
                        }
                        HookOutcome::Failed => {
                            self.steps.clear();
                            self.pending = None;
                        }
                    }
                    self.phase = Phase::Emitting;
                }
                Phase::Emitting => {
                    if let Some(effect) = self.steps.pop_front() {
                        return Step::Yield(effect);
                    }

                    let now = ctx.now();
                    let row = ctx.world.registry.get(&self.comp_id).map(|component| {
                        component.core().make_row(
                            now,
                            "GENERATE",
                            self.values.clone(),
                            self.pending.clone(),
                            None,
                        )
                    });
                    if let Some(row) = row {
                        ctx.log(row);
                    }

                    if let Some(output) = self.pending.take() {
                        ctx.dispatch(&self.comp_id, Some(output));
                    }

                    self.emitted += 1;
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    self.phase = Phase::Idle;
                }
            }
        }
    }
}
