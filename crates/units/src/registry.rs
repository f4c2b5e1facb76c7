//! Mutable unit collection with a cached chunk graph
//!
//! [`UnitRegistry`] owns the units, keeps an id index, and lazily
//! rebuilds the chunk graph after mutations. Registering n units costs
//! n insertions plus one rebuild at the next query, not n rebuilds.
//! Queries take `&mut self`, so the borrow checker serializes them
//! against mutations; the registry holds no interior state.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use tracing::debug;

use strata_chunk_graph::{Chunk, ChunkGraph, Error, Result, build_chunk_graph};

use crate::{EdgeStrategy, TagOverlapEdges, TagSets, Unit};

/// Registry of build units with a lazily cached chunk graph.
///
/// `S` selects how dependency edges are derived from the units; see
/// [`crate::DeclaredEdges`] and [`crate::TagOverlapEdges`].
pub struct UnitRegistry<U: Unit, S> {
    units: Vec<U>,
    index: HashMap<U::Id, usize>,
    graph: Option<ChunkGraph<U::Id>>,
    _strategy: PhantomData<S>,
}

impl<U: Unit, S> UnitRegistry<U, S> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            index: HashMap::new(),
            graph: None,
            _strategy: PhantomData,
        }
    }

    /// Number of registered units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry has no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether a unit with this id is registered.
    #[must_use]
    pub fn contains(&self, id: &U::Id) -> bool {
        self.index.contains_key(id)
    }

    /// The unit registered under this id.
    #[must_use]
    pub fn get(&self, id: &U::Id) -> Option<&U> {
        self.index.get(id).map(|&slot| &self.units[slot])
    }

    /// All units in registration order.
    #[must_use]
    pub fn units(&self) -> &[U] {
        &self.units
    }

    /// Register a unit.
    ///
    /// Returns `false` without modifying the registry when a unit with
    /// the same id is already present.
    pub fn register(&mut self, unit: U) -> bool {
        let id = unit.id();
        if self.index.contains_key(&id) {
            debug!("Refused duplicate unit {:?}", id);
            return false;
        }

        debug!("Registered unit {:?}", id);
        self.index.insert(id, self.units.len());
        self.units.push(unit);
        self.invalidate();
        true
    }

    /// Register every unit from the iterator.
    ///
    /// Duplicates are refused individually; returns how many units
    /// were actually added.
    pub fn extend(&mut self, units: impl IntoIterator<Item = U>) -> usize {
        let mut added = 0;
        for unit in units {
            if self.register(unit) {
                added += 1;
            }
        }
        added
    }

    /// Remove a unit by id, returning it.
    ///
    /// Remaining units keep their relative registration order.
    pub fn unregister(&mut self, id: &U::Id) -> Option<U> {
        let slot = self.index.remove(id)?;
        let unit = self.units.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }

        debug!("Unregistered unit {:?}", id);
        self.invalidate();
        Some(unit)
    }

    fn invalidate(&mut self) {
        if self.graph.take().is_some() {
            debug!("Invalidated chunk graph cache");
        }
    }
}

impl<U: Unit, S: EdgeStrategy<U>> UnitRegistry<U, S> {
    /// The chunk graph over the current universe, rebuilding it if a
    /// mutation invalidated the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndeclaredDependencies`] when a unit's edges
    /// name an id that is not registered.
    pub fn chunk_graph(&mut self) -> Result<&ChunkGraph<U::Id>> {
        let graph = match self.graph.take() {
            Some(graph) => graph,
            None => {
                let rebuilt = build_chunk_graph(&S::view(&self.units))?;
                debug!(
                    "Rebuilt chunk graph: {} units in {} chunks",
                    rebuilt.node_count(),
                    rebuilt.chunk_count()
                );
                rebuilt
            }
        };
        Ok(self.graph.insert(graph))
    }

    /// Chunks of the current universe in dependency-first order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndeclaredDependencies`] when a unit's edges
    /// name an id that is not registered.
    pub fn sorted_chunks(&mut self) -> Result<Vec<Chunk<U::Id>>> {
        let graph = self.chunk_graph()?;
        Ok(graph.chunks().cloned().collect())
    }

    /// Chunks intersecting `subset`, in dependency-first order.
    ///
    /// Chunk membership and edges are always computed over the full
    /// universe, so a cycle spanning units outside the subset still
    /// collapses into one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndeclaredDependencies`] when a unit's edges
    /// name an id that is not registered.
    pub fn sorted_chunks_for(&mut self, subset: &HashSet<U::Id>) -> Result<Vec<Chunk<U::Id>>> {
        let graph = self.chunk_graph()?;
        Ok(graph
            .chunks()
            .filter(|chunk| chunk.iter().any(|id| subset.contains(id)))
            .cloned()
            .collect())
    }

    /// A total unit order with every dependency before its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] naming the members of every
    /// cyclic group when the universe is not acyclic. A partial order
    /// is never returned. Also fails with
    /// [`Error::UndeclaredDependencies`] on unresolved edges.
    pub fn sorted_units(&mut self) -> Result<Vec<U::Id>> {
        let graph = self.chunk_graph()?;

        let cycles: Vec<Vec<String>> = graph
            .chunks()
            .filter(|chunk| !chunk.is_singleton())
            .map(|chunk| chunk.iter().map(|id| format!("{id:?}")).collect())
            .collect();
        if !cycles.is_empty() {
            return Err(Error::CycleDetected { cycles });
        }

        Ok(graph
            .chunks()
            .flat_map(|chunk| chunk.iter().cloned())
            .collect())
    }

    /// Sort a caller-supplied id list in place by the chunk order.
    ///
    /// Works on cyclic universes. Ids unknown to the registry keep
    /// their relative order after all known ids.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndeclaredDependencies`] when a unit's edges
    /// name an id that is not registered.
    pub fn sort_units(&mut self, ids: &mut [U::Id]) -> Result<()> {
        let graph = self.chunk_graph()?;
        graph.sort_nodes(ids);
        Ok(())
    }

    /// Whether every chunk of the current universe is a singleton.
    ///
    /// Callers consult this before unit-level scheduling; chunk-level
    /// scheduling via [`Self::sorted_chunks`] works either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndeclaredDependencies`] when a unit's edges
    /// name an id that is not registered.
    pub fn is_acyclic(&mut self) -> Result<bool> {
        Ok(self.chunk_graph()?.is_acyclic())
    }
}

impl<U: TagSets> UnitRegistry<U, TagOverlapEdges> {
    /// Units producing the given tag, in registration order.
    #[must_use]
    pub fn producers_of(&self, tag: &U::Tag) -> Vec<&U> {
        self.units
            .iter()
            .filter(|unit| unit.output_tags().any(|t| &t == tag))
            .collect()
    }

    /// Units consuming the given tag, in registration order.
    #[must_use]
    pub fn consumers_of(&self, tag: &U::Tag) -> Vec<&U> {
        self.units
            .iter()
            .filter(|unit| unit.input_tags().any(|t| &t == tag))
            .collect()
    }
}

impl<U: Unit, S> Default for UnitRegistry<U, S> {
    fn default() -> Self {
        Self::new()
    }
}
