//! A minimal queueing run: one generator feeding a two-slot service station.
//!
//! ```text
//! cargo run --example queueing
//! ```

use serde_json::json;

use simflow::builder::SimulationBuilder;
use simflow::config::{ComponentSpec, ComponentStore};
use simflow::graph::Edge;
use simflow::hooks::{HookFlow, HookRegistry};
use simflow::log::StdOutSink;
use simflow::payload::{AttrKind, GenType, GenTypeState};
use simflow::scheduler::Effect;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    simflow::telemetry::init();

    // One payload type: an "order" with a size attribute.
    let mut order = GenType::new("order", "gen");
    order.create_attribute("size", AttrKind::Int, json!(1))?;
    let mut types = GenTypeState::new();
    types.insert(order)?;

    // Components: a bounded generator and a station holding each order
    // for two ticks.
    let generator: ComponentSpec = serde_json::from_value(json!({
        "typeName": "OrderGenerator",
        "compName": "order generator",
        "id": "gen",
        "category": "generator",
        "inputData": {"gen_count": 8},
        "GenData": {"config": {}, "types": ["order"]},
    }))?;
    let station: ComponentSpec = serde_json::from_value(json!({
        "typeName": "PackingStation",
        "compName": "packing station",
        "id": "station",
        "category": "resource",
        "inputData": {"capacity": 2},
        "Runners": {"run": "pack"},
    }))?;

    let mut store = ComponentStore::new();
    store.insert("gen", generator);
    store.insert("station", station);

    let mut hooks = HookRegistry::new();
    hooks.register("pack", |_core, input| {
        Ok(HookFlow::with_steps(
            vec![Effect::Timeout(2)],
            input.cloned(),
        ))
    });

    let mut sim = SimulationBuilder::new("queueing", ".", ".")
        .with_run_time(40)
        .with_hook_registry(hooks)
        .with_sink(StdOutSink::default())
        .build_from_parts(
            store,
            types,
            vec![Edge::new("gen", "order-out", "station", "order-in", "e1")],
        )?;

    sim.run()?;
    println!("finished at t={}", sim.now());
    Ok(())
}
