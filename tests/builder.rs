//! Configuration loading, fatal build errors, and run determinism.

mod common;

use std::fs;

use common::{generator_spec, resource_spec, store, token_types};
use simflow::builder::{BuildError, SimulationBuilder};
use simflow::graph::Edge;
use simflow::payload::GenTypeState;

fn write_project(
    dir: &std::path::Path,
    specs: Vec<simflow::config::ComponentSpec>,
    types: &GenTypeState,
    edges: &[Edge],
) {
    fs::write(
        dir.join("dataState.json"),
        serde_json::to_string_pretty(&store(specs)).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.join("genState.json"),
        serde_json::to_string_pretty(types).unwrap(),
    )
    .unwrap();
    fs::write(
        dir.join("edge.json"),
        serde_json::to_string_pretty(edges).unwrap(),
    )
    .unwrap();
}

#[test]
fn build_loads_the_three_documents_and_writes_the_run_csv() {
    let project = tempfile::tempdir().unwrap();
    let runs = tempfile::tempdir().unwrap();
    write_project(
        project.path(),
        vec![
            generator_spec("gen-1", Some(3), &["tok"]),
            resource_spec("res-1", 1, None),
        ],
        &token_types("gen-1"),
        &[Edge::new("gen-1", "tok-out", "res-1", "tok-in", "e1")],
    );

    let mut sim = SimulationBuilder::new("smoke", project.path(), runs.path())
        .with_run_time(50)
        .build()
        .unwrap();
    sim.run().unwrap();
    sim.world().log.close();

    let csv = fs::read_to_string(runs.path().join("smoke.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "time,component_id,component_type,action,values,PDV,addition"
    );
    // 3 GENERATE + 3 ENTER + 3 EXIT
    assert_eq!(lines.len(), 10);
}

#[test]
fn identical_configurations_produce_identical_csv_output() {
    let project = tempfile::tempdir().unwrap();
    let runs = tempfile::tempdir().unwrap();
    write_project(
        project.path(),
        vec![
            generator_spec("gen-1", Some(5), &["tok"]),
            resource_spec("res-1", 2, None),
        ],
        &token_types("gen-1"),
        &[Edge::new("gen-1", "tok-out", "res-1", "tok-in", "e1")],
    );

    for name in ["first", "second"] {
        let mut sim = SimulationBuilder::new(name, project.path(), runs.path())
            .with_run_time(60)
            .build()
            .unwrap();
        sim.run().unwrap();
        sim.world().log.close();
    }

    let first = fs::read(runs.path().join("first.csv")).unwrap();
    let second = fs::read(runs.path().join("second.csv")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn missing_document_is_fatal() {
    let project = tempfile::tempdir().unwrap();
    let runs = tempfile::tempdir().unwrap();

    let err = SimulationBuilder::new("broken", project.path(), runs.path())
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::Io { .. }));
}

#[test]
fn malformed_json_is_fatal() {
    let project = tempfile::tempdir().unwrap();
    let runs = tempfile::tempdir().unwrap();
    write_project(
        project.path(),
        vec![generator_spec("gen-1", Some(1), &["tok"])],
        &token_types("gen-1"),
        &[],
    );
    fs::write(project.path().join("edge.json"), "{not json").unwrap();

    let err = SimulationBuilder::new("broken", project.path(), runs.path())
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::Json { .. }));
}

#[test]
fn unregistered_category_is_fatal() {
    let mut spec = generator_spec("odd-1", None, &[]);
    spec.category = "teleporter".to_string();

    let err = SimulationBuilder::new("t", ".", ".")
        .build_from_parts(store(vec![spec]), GenTypeState::new(), vec![])
        .unwrap_err();
    assert!(matches!(err, BuildError::UnregisteredCategory { .. }));
}

#[test]
fn resource_requires_a_valid_capacity() {
    let missing = {
        let mut spec = resource_spec("res-1", 1, None);
        spec.input_data.remove("capacity");
        spec
    };
    let err = SimulationBuilder::new("t", ".", ".")
        .build_from_parts(store(vec![missing]), GenTypeState::new(), vec![])
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::MissingInput {
            field: "capacity",
            ..
        }
    ));

    let zero = resource_spec("res-1", 0, None);
    let err = SimulationBuilder::new("t", ".", ".")
        .build_from_parts(store(vec![zero]), GenTypeState::new(), vec![])
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidInput { .. }));

    let not_an_int = {
        let mut spec = resource_spec("res-1", 1, None);
        spec.input_data
            .insert("capacity".to_string(), serde_json::json!("three"));
        spec
    };
    let err = SimulationBuilder::new("t", ".", ".")
        .build_from_parts(store(vec![not_an_int]), GenTypeState::new(), vec![])
        .unwrap_err();
    assert!(matches!(err, BuildError::InvalidInput { .. }));
}

#[test]
fn duplicate_component_ids_are_fatal() {
    let mut conflicting = store(vec![generator_spec("dup", Some(1), &[])]);
    let mut other = resource_spec("other", 1, None);
    other.id = Some("dup".to_string());
    conflicting.insert("other-key", other);

    let err = SimulationBuilder::new("t", ".", ".")
        .build_from_parts(conflicting, GenTypeState::new(), vec![])
        .unwrap_err();
    assert!(matches!(err, BuildError::Component(_)));
}

#[test]
fn duplicate_edge_keys_are_fatal_at_build() {
    let err = SimulationBuilder::new("t", ".", ".")
        .build_from_parts(
            store(vec![generator_spec("gen-1", Some(1), &["tok"])]),
            token_types("gen-1"),
            vec![
                Edge::new("gen-1", "tok-out", "a", "tok-in", "e1"),
                Edge::new("gen-1", "tok-out", "b", "tok-in", "e2"),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, BuildError::Graph(_)));
}

#[test]
fn missing_root_component_fails_at_run() {
    // an edge names a component that was never defined
    let mut sim = SimulationBuilder::new("t", ".", ".")
        .build_from_parts(
            store(vec![resource_spec("res-1", 1, None)]),
            GenTypeState::new(),
            vec![Edge::new("ghost", "tok-out", "res-1", "tok-in", "e1")],
        )
        .unwrap();
    let err = sim.run().unwrap_err();
    assert!(matches!(
        err,
        simflow::runtime::RuntimeError::MissingRootComponent(_)
    ));
}
