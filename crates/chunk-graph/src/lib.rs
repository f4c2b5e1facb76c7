//! Dependency-chunk scheduling primitives for strata.
//!
//! This crate condenses a directed dependency graph into chunks (strongly
//! connected components) and produces deterministic, dependency-respecting
//! schedules over them, using petgraph for the condensed graph. Cycles are
//! not errors here: a cycle collapses into one chunk that is scheduled as
//! a single entity, and only node-level linearization refuses cyclic input.
//!
//! # Key Types
//!
//! - [`GraphView`]: Read-only view of a dependency graph that callers implement
//! - [`CycleAnalyzer`]: One analysis pass - chunk assignment, order, comparator
//! - [`Chunk`]: A set of mutually dependent nodes scheduled as one entity
//! - [`ChunkGraph`]: The acyclic quotient graph of chunks
//!
//! # Example
//!
//! ```ignore
//! use strata_chunk_graph::{GraphView, build_chunk_graph};
//!
//! // Expose an existing module table as a graph view
//! struct Modules {
//!     names: Vec<String>,
//!     deps: std::collections::HashMap<String, Vec<String>>,
//! }
//!
//! impl GraphView for Modules {
//!     type Node = String;
//!
//!     fn nodes(&self) -> impl Iterator<Item = String> {
//!         self.names.iter().cloned()
//!     }
//!
//!     fn depends_on(&self, node: &String) -> impl Iterator<Item = String> {
//!         self.deps.get(node).into_iter().flatten().cloned()
//!     }
//! }
//!
//! // Chunks come back in dependency order; cyclic modules share a chunk
//! let graph = build_chunk_graph(&modules)?;
//! for chunk in graph.chunks() {
//!     schedule(chunk.nodes());
//! }
//! ```

mod analyzer;
mod chunk;
mod error;
mod graph;

pub use analyzer::CycleAnalyzer;
pub use chunk::Chunk;
pub use error::{Error, Result};
pub use graph::{
    ChunkGraph, build_chunk_graph, dependency_closure, dependent_closure, sorted_chunks,
    sorted_chunks_filtered,
};

/// Read-only view of a dependency graph.
///
/// Implement this for whatever owns the node universe - a registry, a
/// module table, a configuration snapshot. The analysis never mutates the
/// view and never performs I/O through it.
pub trait GraphView {
    /// Node handle type. The `Debug` bound lets error reports name the
    /// offending nodes.
    type Node: Clone + Eq + std::hash::Hash + std::fmt::Debug;

    /// Enumerate the declared node set.
    ///
    /// Enumeration order is the deterministic tie-break for every derived
    /// ordering; duplicate yields collapse to their first occurrence.
    fn nodes(&self) -> impl Iterator<Item = Self::Node>;

    /// The nodes that `node` depends on, i.e. nodes that must be scheduled
    /// no later than `node`. May be computed lazily.
    ///
    /// Every yielded node must itself be declared by [`GraphView::nodes`];
    /// a violation surfaces as [`Error::UndeclaredDependencies`] during
    /// analysis, never as a panic inside the traversal.
    fn depends_on(&self, node: &Self::Node) -> impl Iterator<Item = Self::Node>;
}

impl<G: GraphView> GraphView for &G {
    type Node = G::Node;

    fn nodes(&self) -> impl Iterator<Item = Self::Node> {
        (**self).nodes()
    }

    fn depends_on(&self, node: &Self::Node) -> impl Iterator<Item = Self::Node> {
        (**self).depends_on(node)
    }
}
