//! End-to-end scheduling through the unit registry.
//!
//! Models a small compiler pipeline where edges are derived from
//! artifact tags, plus a module universe with declared dependencies.

use std::collections::HashSet;

use strata_chunk_graph::Error;
use strata_units::{DeclaredDeps, DeclaredEdges, TagOverlapEdges, TagSets, Unit, UnitRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Artifact {
    Source,
    Class,
    Resource,
    Archive,
}

#[derive(Debug, Clone)]
struct Compiler {
    name: &'static str,
    inputs: Vec<Artifact>,
    outputs: Vec<Artifact>,
}

impl Compiler {
    fn new(name: &'static str, inputs: &[Artifact], outputs: &[Artifact]) -> Self {
        Self {
            name,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }
}

impl Unit for Compiler {
    type Id = &'static str;

    fn id(&self) -> &'static str {
        self.name
    }
}

impl TagSets for Compiler {
    type Tag = Artifact;

    fn input_tags(&self) -> impl Iterator<Item = Artifact> {
        self.inputs.iter().copied()
    }

    fn output_tags(&self) -> impl Iterator<Item = Artifact> {
        self.outputs.iter().copied()
    }
}

#[derive(Debug, Clone)]
struct Module {
    name: &'static str,
    deps: Vec<&'static str>,
}

impl Module {
    fn new(name: &'static str, deps: &[&'static str]) -> Self {
        Self {
            name,
            deps: deps.to_vec(),
        }
    }
}

impl Unit for Module {
    type Id = &'static str;

    fn id(&self) -> &'static str {
        self.name
    }
}

impl DeclaredDeps for Module {
    fn declared_dependencies(&self) -> impl Iterator<Item = &'static str> {
        self.deps.iter().copied()
    }
}

/// javac and resources feed packaging; javac's own input has no
/// producer, so it starts the pipeline.
fn compiler_pipeline() -> UnitRegistry<Compiler, TagOverlapEdges> {
    let mut registry = UnitRegistry::new();
    registry.register(Compiler::new(
        "javac",
        &[Artifact::Source],
        &[Artifact::Class],
    ));
    registry.register(Compiler::new("resources", &[], &[Artifact::Resource]));
    registry.register(Compiler::new(
        "packaging",
        &[Artifact::Class, Artifact::Resource],
        &[Artifact::Archive],
    ));
    registry
}

#[test]
fn packaging_runs_after_both_producers() {
    let mut registry = compiler_pipeline();

    let order = registry.sorted_units().unwrap();
    assert_eq!(order, vec!["javac", "resources", "packaging"]);

    let graph = registry.chunk_graph().unwrap();
    let packaging = graph.chunk_index_of(&"packaging").unwrap();
    assert_eq!(graph.dependencies_of(packaging).count(), 2);
}

#[test]
fn tag_pipeline_is_acyclic() {
    let mut registry = compiler_pipeline();

    assert!(registry.is_acyclic().unwrap());
    let chunks = registry.sorted_chunks().unwrap();
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(strata_chunk_graph::Chunk::is_singleton));
}

#[test]
fn registering_a_consumer_schedules_it_after_its_producer() {
    let mut registry = compiler_pipeline();
    let before = registry.sorted_units().unwrap();
    assert!(!before.contains(&"deploy"));

    registry.register(Compiler::new("deploy", &[Artifact::Archive], &[]));

    let after = registry.sorted_units().unwrap();
    let archive_pos = after.iter().position(|id| *id == "packaging").unwrap();
    let deploy_pos = after.iter().position(|id| *id == "deploy").unwrap();
    assert!(archive_pos < deploy_pos);
}

#[test]
fn mutually_feeding_compilers_collapse_into_one_chunk() {
    let mut registry: UnitRegistry<Compiler, TagOverlapEdges> = UnitRegistry::new();
    registry.register(Compiler::new(
        "forms",
        &[Artifact::Class],
        &[Artifact::Source],
    ));
    registry.register(Compiler::new(
        "javac",
        &[Artifact::Source],
        &[Artifact::Class],
    ));

    assert!(!registry.is_acyclic().unwrap());

    let chunks = registry.sorted_chunks().unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].contains(&"forms"));
    assert!(chunks[0].contains(&"javac"));

    let err = registry.sorted_units().unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));
    assert!(err.to_string().contains("forms"));
    assert!(err.to_string().contains("javac"));
}

#[test]
fn self_instrumenting_compiler_stays_schedulable() {
    let mut registry: UnitRegistry<Compiler, TagOverlapEdges> = UnitRegistry::new();
    registry.register(Compiler::new("javac", &[], &[Artifact::Class]));
    // Consumes and produces the same tag: a self-edge, not a cycle.
    registry.register(Compiler::new(
        "instrument",
        &[Artifact::Class],
        &[Artifact::Class],
    ));

    assert!(registry.is_acyclic().unwrap());
    assert_eq!(registry.sorted_units().unwrap(), vec!["javac", "instrument"]);
}

#[test]
fn producers_and_consumers_follow_registration_order() {
    let registry = compiler_pipeline();

    let producers: Vec<_> = registry
        .producers_of(&Artifact::Class)
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(producers, vec!["javac"]);

    let consumers: Vec<_> = registry
        .consumers_of(&Artifact::Class)
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(consumers, vec!["packaging"]);

    assert!(registry.producers_of(&Artifact::Source).is_empty());
}

#[test]
fn filtered_schedule_keeps_cycle_members_together() {
    let mut registry: UnitRegistry<Module, DeclaredEdges> = UnitRegistry::new();
    registry.register(Module::new("a", &["b"]));
    registry.register(Module::new("b", &["a"]));
    registry.register(Module::new("c", &["a"]));
    registry.register(Module::new("docs", &[]));

    // "a" is not requested, but it rides along with "b"'s chunk.
    let subset: HashSet<&str> = ["b", "c"].into_iter().collect();
    let chunks = registry.sorted_chunks_for(&subset).unwrap();

    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].contains(&"a"));
    assert!(chunks[0].contains(&"b"));
    assert!(chunks[1].contains(&"c"));
}

#[test]
fn schedule_is_stable_across_rebuilds() {
    let mut registry: UnitRegistry<Module, DeclaredEdges> = UnitRegistry::new();
    registry.register(Module::new("core", &[]));
    registry.register(Module::new("api", &["core"]));
    registry.register(Module::new("cli", &["api", "core"]));

    let first = registry.sorted_units().unwrap();

    // Force a rebuild without changing the universe.
    let removed = registry.unregister(&"cli").unwrap();
    registry.register(removed);

    let second = registry.sorted_units().unwrap();
    assert_eq!(first, second);
}
