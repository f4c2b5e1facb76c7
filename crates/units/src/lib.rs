//! Build-unit capabilities and a chunk-scheduling registry
//!
//! This crate layers domain concepts over [`strata_chunk_graph`]: what
//! a schedulable unit is, how dependency edges between units are
//! derived, and a registry that keeps a lazily rebuilt chunk graph
//! over a mutable unit collection.
//!
//! Edges come from one of two derivations:
//! - [`DeclaredEdges`]: a unit names its dependencies directly
//! - [`TagOverlapEdges`]: a unit depends on every producer of a tag it
//!   consumes
//!
//! # Example
//!
//! ```
//! use strata_units::{TagOverlapEdges, TagSets, Unit, UnitRegistry};
//!
//! #[derive(Clone)]
//! struct Processor {
//!     name: &'static str,
//!     inputs: Vec<&'static str>,
//!     outputs: Vec<&'static str>,
//! }
//!
//! impl Unit for Processor {
//!     type Id = &'static str;
//!
//!     fn id(&self) -> &'static str {
//!         self.name
//!     }
//! }
//!
//! impl TagSets for Processor {
//!     type Tag = &'static str;
//!
//!     fn input_tags(&self) -> impl Iterator<Item = &'static str> {
//!         self.inputs.iter().copied()
//!     }
//!
//!     fn output_tags(&self) -> impl Iterator<Item = &'static str> {
//!         self.outputs.iter().copied()
//!     }
//! }
//!
//! let mut registry: UnitRegistry<Processor, TagOverlapEdges> = UnitRegistry::new();
//! registry.register(Processor {
//!     name: "javac",
//!     inputs: vec![],
//!     outputs: vec!["class"],
//! });
//! registry.register(Processor {
//!     name: "jar",
//!     inputs: vec!["class"],
//!     outputs: vec![],
//! });
//!
//! let order = registry.sorted_units()?;
//! assert_eq!(order, vec!["javac", "jar"]);
//! # Ok::<(), strata_chunk_graph::Error>(())
//! ```

use std::fmt::Debug;
use std::hash::Hash;

mod registry;
mod strategy;

pub use registry::UnitRegistry;
pub use strategy::{
    DeclaredDepsGraph, DeclaredEdges, EdgeStrategy, TagOverlapEdges, TagOverlapGraph,
};

/// A schedulable build unit with a stable identity.
pub trait Unit {
    /// Identifier used as the graph node for this unit.
    type Id: Clone + Eq + Hash + Debug;

    /// The unit's identifier.
    fn id(&self) -> Self::Id;
}

/// Units that name their dependencies directly.
pub trait DeclaredDeps: Unit {
    /// Ids of the units this unit depends on.
    fn declared_dependencies(&self) -> impl Iterator<Item = Self::Id>;
}

/// Units that describe what they consume and produce.
///
/// A unit depends on every unit whose output tags intersect its input
/// tags; nothing else about the unit's work is known to the scheduler.
pub trait TagSets: Unit {
    /// Marker for a category of consumed or produced artifacts.
    type Tag: Clone + Eq + Hash;

    /// Tags this unit consumes.
    fn input_tags(&self) -> impl Iterator<Item = Self::Tag>;

    /// Tags this unit produces.
    fn output_tags(&self) -> impl Iterator<Item = Self::Tag>;
}
