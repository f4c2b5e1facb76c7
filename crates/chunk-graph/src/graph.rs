//! Acyclic chunk graph built from cycle analysis.
//!
//! This module condenses a dependency graph into its quotient graph of
//! chunks using petgraph and provides the scheduling queries over it.

use crate::{Chunk, CycleAnalyzer, GraphView, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// The acyclic quotient graph of chunks.
///
/// Chunks are inserted in dependency order, so the chunk at node index `i`
/// depends only on chunks with smaller indices and iterating over
/// [`ChunkGraph::chunks`] already yields a valid schedule. Every stored
/// edge points from a dependent chunk to a dependency chunk with a smaller
/// index, which makes the graph acyclic by construction rather than by
/// later verification.
pub struct ChunkGraph<N> {
    /// The condensed graph; node weights are the chunks themselves.
    graph: DiGraph<Chunk<N>, ()>,
    /// Map from node to (owning chunk, slot within that chunk).
    membership: HashMap<N, (NodeIndex, usize)>,
}

impl<N> ChunkGraph<N>
where
    N: Clone + Eq + Hash,
{
    pub(crate) fn from_analysis(analysis: &CycleAnalyzer<N>) -> Self
    where
        N: std::fmt::Debug,
    {
        let chunk_count = analysis.chunk_members.len();
        let mut graph = DiGraph::with_capacity(chunk_count, chunk_count);
        let mut indices: Vec<NodeIndex> = Vec::with_capacity(chunk_count);
        let mut membership = HashMap::with_capacity(analysis.nodes.len());

        // Insert chunks in completion order so node-index order is the
        // dependency order.
        for members in &analysis.chunk_members {
            let chunk = Chunk::new(
                members
                    .iter()
                    .map(|&member| analysis.nodes[member].clone())
                    .collect(),
            );
            let index = graph.add_node(chunk);
            indices.push(index);
            for (slot, &member) in members.iter().enumerate() {
                membership.insert(analysis.nodes[member].clone(), (index, slot));
            }
        }

        // Project the original edges onto chunks, dropping intra-chunk
        // edges (self-loops included) and duplicates.
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for (from, targets) in analysis.edges.iter().enumerate() {
            let from_chunk = analysis.chunk_of[from];
            for &to in targets {
                let to_chunk = analysis.chunk_of[to];
                if from_chunk != to_chunk && seen.insert((from_chunk, to_chunk)) {
                    debug_assert!(to_chunk < from_chunk, "dependencies complete first");
                    graph.add_edge(indices[from_chunk], indices[to_chunk], ());
                }
            }
        }

        Self { graph, membership }
    }

    /// Number of chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of nodes across all chunks.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.membership.len()
    }

    /// Number of deduplicated inter-chunk edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph holds no chunks at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// The chunks in dependency order: every chunk appears strictly after
    /// the chunks it depends on.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk<N>> {
        self.graph.node_weights()
    }

    /// The chunk stored at `index`.
    #[must_use]
    pub fn get(&self, index: NodeIndex) -> Option<&Chunk<N>> {
        self.graph.node_weight(index)
    }

    /// Index of the chunk containing `node`.
    #[must_use]
    pub fn chunk_index_of(&self, node: &N) -> Option<NodeIndex> {
        self.membership.get(node).map(|&(index, _)| index)
    }

    /// The chunk containing `node`.
    #[must_use]
    pub fn chunk_of(&self, node: &N) -> Option<&Chunk<N>> {
        self.chunk_index_of(node)
            .and_then(|index| self.graph.node_weight(index))
    }

    /// Whether `node` was part of the analyzed snapshot.
    #[must_use]
    pub fn contains_node(&self, node: &N) -> bool {
        self.membership.contains_key(node)
    }

    /// Chunks that the chunk at `index` depends on.
    pub fn dependencies_of(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> {
        self.graph.neighbors_directed(index, Direction::Outgoing)
    }

    /// Chunks that depend on the chunk at `index`.
    pub fn dependents_of(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> {
        self.graph.neighbors_directed(index, Direction::Incoming)
    }

    /// Whether the dependent chunk `from` has a direct edge to its
    /// dependency chunk `to`.
    #[must_use]
    pub fn contains_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.graph.find_edge(from, to).is_some()
    }

    /// True when every chunk is a singleton, i.e. the source graph had no
    /// cycle spanning two or more nodes. Self-loops collapse into
    /// singleton chunks and do not clear this flag.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.graph.node_weights().all(Chunk::is_singleton)
    }

    /// Position of `node` as (chunk index, slot inside the chunk).
    #[must_use]
    pub fn node_position(&self, node: &N) -> Option<(usize, usize)> {
        self.membership
            .get(node)
            .map(|&(index, slot)| (index.index(), slot))
    }

    /// A total order consistent with the chunk order.
    ///
    /// Nodes outside the analyzed snapshot sort after every known node and
    /// compare equal among themselves, so a stable sort leaves their
    /// relative order untouched.
    pub fn comparator(&self) -> impl Fn(&N, &N) -> Ordering + '_ {
        move |a, b| match (self.node_position(a), self.node_position(b)) {
            (Some(pa), Some(pb)) => pa.cmp(&pb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Stable-sort an arbitrary caller-supplied list into dependency order.
    pub fn sort_nodes(&self, nodes: &mut [N]) {
        nodes.sort_by(self.comparator());
    }

    /// Group chunks into levels by dependency depth.
    ///
    /// Level 0 holds chunks with no dependencies; every later level holds
    /// chunks whose dependencies all sit in earlier levels. Chunks within
    /// one level are independent of each other and can be scheduled
    /// concurrently; within a level they keep dependency order.
    #[must_use]
    pub fn parallel_levels(&self) -> Vec<Vec<NodeIndex>> {
        let mut levels: Vec<Vec<NodeIndex>> = Vec::new();
        let mut level_of: HashMap<NodeIndex, usize> = HashMap::new();

        // Node indices ascend in dependency order, so one pass suffices.
        for index in self.graph.node_indices() {
            let mut level = 0;
            for dep in self.dependencies_of(index) {
                if let Some(&dep_level) = level_of.get(&dep) {
                    level = level.max(dep_level + 1);
                }
            }
            if level >= levels.len() {
                levels.resize(level + 1, vec![]);
            }
            levels[level].push(index);
            level_of.insert(index, level);
        }

        levels
    }
}

/// The quotient graph is itself a graph view over chunk indices, so an
/// analysis can be re-run on it (tests use this to show the quotient is
/// acyclic through the public API alone).
impl<N> GraphView for ChunkGraph<N>
where
    N: Clone + Eq + Hash + std::fmt::Debug,
{
    type Node = NodeIndex;

    fn nodes(&self) -> impl Iterator<Item = NodeIndex> {
        self.graph.node_indices()
    }

    fn depends_on(&self, node: &NodeIndex) -> impl Iterator<Item = NodeIndex> {
        self.graph.neighbors_directed(*node, Direction::Outgoing)
    }
}

/// Build the chunk graph for `view`: one chunk per strongly connected
/// component, edges deduplicated, self-loops dropped.
///
/// # Errors
///
/// Returns [`crate::Error::UndeclaredDependencies`] if `view` yields a
/// dependency outside its declared node set.
pub fn build_chunk_graph<G: GraphView>(view: &G) -> Result<ChunkGraph<G::Node>> {
    Ok(ChunkGraph::from_analysis(&CycleAnalyzer::run(view)?))
}

/// The chunks of `view` in dependency order.
///
/// # Errors
///
/// Returns [`crate::Error::UndeclaredDependencies`] if `view` yields a
/// dependency outside its declared node set.
pub fn sorted_chunks<G: GraphView>(view: &G) -> Result<Vec<Chunk<G::Node>>> {
    Ok(CycleAnalyzer::run(view)?.ordered_chunks())
}

/// The chunks of `view` that contain at least one node of `subset`, in
/// dependency order.
///
/// Chunk membership and edges are always computed over the full universe,
/// so a cycle running through nodes outside `subset` still collapses into
/// a single chunk. Filtering never reorders the surviving chunks.
///
/// # Errors
///
/// Returns [`crate::Error::UndeclaredDependencies`] if `view` yields a
/// dependency outside its declared node set.
pub fn sorted_chunks_filtered<G: GraphView>(
    view: &G,
    subset: &HashSet<G::Node>,
) -> Result<Vec<Chunk<G::Node>>> {
    let mut chunks = sorted_chunks(view)?;
    chunks.retain(|chunk| chunk.iter().any(|node| subset.contains(node)));
    Ok(chunks)
}

/// All nodes reachable from `roots` along depends-on edges, the roots
/// themselves included. Roots outside the node set are ignored.
///
/// # Errors
///
/// Returns [`crate::Error::UndeclaredDependencies`] if `view` yields a
/// dependency outside its declared node set.
pub fn dependency_closure<G: GraphView>(
    view: &G,
    roots: impl IntoIterator<Item = G::Node>,
) -> Result<HashSet<G::Node>> {
    Ok(CycleAnalyzer::run(view)?.closure(roots, false))
}

/// All nodes that transitively depend on `seeds`, the seeds themselves
/// included - the part of the universe a coordinator must reschedule when
/// the seeds change. Seeds outside the node set are ignored.
///
/// # Errors
///
/// Returns [`crate::Error::UndeclaredDependencies`] if `view` yields a
/// dependency outside its declared node set.
pub fn dependent_closure<G: GraphView>(
    view: &G,
    seeds: impl IntoIterator<Item = G::Node>,
) -> Result<HashSet<G::Node>> {
    Ok(CycleAnalyzer::run(view)?.closure(seeds, true))
}
