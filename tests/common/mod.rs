//! Shared fixtures for integration tests.
#![allow(dead_code)]

use serde_json::json;

use simflow::builder::SimulationBuilder;
use simflow::config::{ComponentSpec, ComponentStore};
use simflow::graph::Edge;
use simflow::hooks::HookRegistry;
use simflow::log::{LogRow, MemorySink};
use simflow::payload::{AttrKind, GenType, GenTypeState};
use simflow::runtime::Simulation;

/// A generator spec emitting the given payload types.
pub fn generator_spec(id: &str, gen_count: Option<i64>, types: &[&str]) -> ComponentSpec {
    let mut input_data = serde_json::Map::new();
    if let Some(n) = gen_count {
        input_data.insert("gen_count".to_string(), json!(n));
    }
    serde_json::from_value(json!({
        "typeName": "TokenGenerator",
        "compName": id,
        "id": id,
        "category": "generator",
        "inputData": input_data,
        "GenData": {"config": {}, "types": types},
    }))
    .expect("generator spec")
}

/// A resource spec, optionally wiring a named `run` hook fragment.
pub fn resource_spec(id: &str, capacity: i64, run_fragment: Option<&str>) -> ComponentSpec {
    let runners = match run_fragment {
        Some(fragment) => json!({ "run": fragment }),
        None => json!({}),
    };
    serde_json::from_value(json!({
        "typeName": "Station",
        "compName": id,
        "id": id,
        "category": "resource",
        "inputData": {"capacity": capacity},
        "Runners": runners,
    }))
    .expect("resource spec")
}

pub fn store(specs: Vec<ComponentSpec>) -> ComponentStore {
    let mut out = ComponentStore::new();
    for spec in specs {
        let key = spec.id.clone().expect("spec id");
        out.insert(key, spec);
    }
    out
}

/// A type registry holding one `tok` payload type with an int attribute.
pub fn token_types(origin: &str) -> GenTypeState {
    let mut tok = GenType::new("tok", origin);
    tok.create_attribute("weight", AttrKind::Int, json!(1))
        .expect("attribute");
    let mut state = GenTypeState::new();
    state.insert(tok).expect("register type");
    state
}

/// Assemble an in-memory simulation capturing rows in a [`MemorySink`].
pub fn build_sim(
    specs: Vec<ComponentSpec>,
    types: GenTypeState,
    edges: Vec<Edge>,
    run_time: Option<u64>,
    hooks: Option<HookRegistry>,
) -> (Simulation, MemorySink) {
    let sink = MemorySink::new();
    let mut builder = SimulationBuilder::new("test", ".", ".").with_sink(sink.clone());
    if let Some(bound) = run_time {
        builder = builder.with_run_time(bound);
    }
    if let Some(registry) = hooks {
        builder = builder.with_hook_registry(registry);
    }
    let sim = builder
        .build_from_parts(store(specs), types, edges)
        .expect("assemble simulation");
    (sim, sink)
}

/// Rows matching one action, in log order.
pub fn rows_with_action(rows: &[LogRow], action: &str) -> Vec<LogRow> {
    rows.iter()
        .filter(|row| row.action == action)
        .cloned()
        .collect()
}

/// Times of all rows matching one action, in log order.
pub fn times_of(rows: &[LogRow], action: &str) -> Vec<u64> {
    rows_with_action(rows, action)
        .iter()
        .map(|row| row.time)
        .collect()
}
