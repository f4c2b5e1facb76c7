//! Strongly-connected-component analysis over a graph snapshot.
//!
//! This module runs a single iterative pass of Tarjan's algorithm over a
//! [`GraphView`] and records the resulting chunks in dependency order.

use crate::{Chunk, ChunkGraph, Error, GraphView, Result};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

const UNVISITED: usize = usize::MAX;

/// One frame of the explicit traversal stack.
struct Frame {
    node: usize,
    cursor: usize,
}

/// The outcome of one cycle analysis over a fixed graph snapshot.
///
/// Construction assigns every node a dense index in enumeration order,
/// validates all edges, and then runs Tarjan's strongly-connected-component
/// algorithm with an explicit work stack - deep dependency chains cannot
/// overflow the call stack. Components complete in dependency order when
/// edges point from dependent to dependency, so the recorded chunk sequence
/// is already a topological order of the condensed graph.
///
/// All outputs are deterministic: ties are broken by the enumeration order
/// of [`GraphView::nodes`], never by hash-map iteration.
pub struct CycleAnalyzer<N> {
    /// Nodes in enumeration order; the index into this vec is the dense id.
    pub(crate) nodes: Vec<N>,
    /// Map from node to dense id.
    pub(crate) index_of: HashMap<N, usize>,
    /// Resolved depends-on adjacency over dense ids, duplicates dropped.
    pub(crate) edges: Vec<Vec<usize>>,
    /// Chunk index per dense id; chunk indices count in dependency order.
    pub(crate) chunk_of: Vec<usize>,
    /// Member dense ids per chunk, each normalized to enumeration order.
    pub(crate) chunk_members: Vec<Vec<usize>>,
    /// Ordinal per dense id in the flattened chunk order.
    position: Vec<usize>,
}

impl<N> CycleAnalyzer<N>
where
    N: Clone + Eq + Hash + fmt::Debug,
{
    /// Analyze the given graph snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UndeclaredDependencies`] if any node yields a
    /// dependency that is not itself declared by [`GraphView::nodes`]. The
    /// error lists every offending edge, not just the first one found.
    pub fn run<G>(view: &G) -> Result<Self>
    where
        G: GraphView<Node = N>,
    {
        // Dense arena in enumeration order; duplicates collapse to their
        // first occurrence.
        let mut nodes: Vec<N> = Vec::new();
        let mut index_of: HashMap<N, usize> = HashMap::new();
        for node in view.nodes() {
            if !index_of.contains_key(&node) {
                index_of.insert(node.clone(), nodes.len());
                nodes.push(node);
            }
        }

        // Resolve every edge up front so referential violations surface
        // before any traversal starts.
        let mut edges: Vec<Vec<usize>> = Vec::with_capacity(nodes.len());
        let mut missing: Vec<(String, String)> = Vec::new();
        let mut seen: HashSet<usize> = HashSet::new();
        for node in &nodes {
            let mut targets = Vec::new();
            seen.clear();
            for dep in view.depends_on(node) {
                if let Some(&dep_index) = index_of.get(&dep) {
                    if seen.insert(dep_index) {
                        targets.push(dep_index);
                    }
                } else {
                    missing.push((format!("{node:?}"), format!("{dep:?}")));
                }
            }
            edges.push(targets);
        }
        if !missing.is_empty() {
            return Err(Error::UndeclaredDependencies { missing });
        }

        let node_count = nodes.len();
        let mut discovery = vec![UNVISITED; node_count];
        let mut low_link = vec![0usize; node_count];
        let mut on_stack = vec![false; node_count];
        let mut stack: Vec<usize> = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut chunk_of = vec![UNVISITED; node_count];
        let mut chunk_members: Vec<Vec<usize>> = Vec::new();
        let mut next_discovery = 0usize;

        // Roots are taken in arena order, which pins down the completion
        // order and with it every derived ordering.
        for root in 0..node_count {
            if discovery[root] != UNVISITED {
                continue;
            }
            discovery[root] = next_discovery;
            low_link[root] = next_discovery;
            next_discovery += 1;
            on_stack[root] = true;
            stack.push(root);
            frames.push(Frame { node: root, cursor: 0 });

            while let Some(frame) = frames.last_mut() {
                let v = frame.node;
                if let Some(&w) = edges[v].get(frame.cursor) {
                    frame.cursor += 1;
                    if discovery[w] == UNVISITED {
                        discovery[w] = next_discovery;
                        low_link[w] = next_discovery;
                        next_discovery += 1;
                        on_stack[w] = true;
                        stack.push(w);
                        frames.push(Frame { node: w, cursor: 0 });
                    } else if on_stack[w] {
                        low_link[v] = low_link[v].min(discovery[w]);
                    }
                } else {
                    frames.pop();
                    if let Some(parent) = frames.last() {
                        low_link[parent.node] = low_link[parent.node].min(low_link[v]);
                    }
                    if low_link[v] == discovery[v] {
                        // `v` roots a completed component: everything above
                        // it on the component stack belongs to one chunk.
                        let chunk_index = chunk_members.len();
                        let mut members = Vec::new();
                        while let Some(w) = stack.pop() {
                            on_stack[w] = false;
                            chunk_of[w] = chunk_index;
                            members.push(w);
                            if w == v {
                                break;
                            }
                        }
                        // Normalize members to arena order so chunk contents
                        // are stable under edge permutations of the same set.
                        members.sort_unstable();
                        chunk_members.push(members);
                    }
                }
            }
        }

        // Flattened order: chunks in dependency order, members in arena order.
        let mut position = vec![0usize; node_count];
        let mut next_position = 0usize;
        for members in &chunk_members {
            for &member in members {
                position[member] = next_position;
                next_position += 1;
            }
        }

        Ok(Self {
            nodes,
            index_of,
            edges,
            chunk_of,
            chunk_members,
            position,
        })
    }

    /// Number of nodes in the analyzed snapshot.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of chunks (strongly connected components).
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunk_members.len()
    }

    /// True when every chunk is a singleton, i.e. no cycle spans two or
    /// more nodes.
    ///
    /// A node that depends only on itself still forms a singleton chunk,
    /// so a self-loop does not clear this flag.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.chunk_members.iter().all(|members| members.len() == 1)
    }

    /// Index of the chunk containing `node`, counted in dependency order.
    #[must_use]
    pub fn chunk_index_of(&self, node: &N) -> Option<usize> {
        self.index_of.get(node).map(|&index| self.chunk_of[index])
    }

    /// Ordinal of `node` in the flattened dependency order.
    #[must_use]
    pub fn position_of(&self, node: &N) -> Option<usize> {
        self.index_of.get(node).map(|&index| self.position[index])
    }

    /// The chunks in dependency order: every chunk appears strictly after
    /// the chunks it depends on.
    #[must_use]
    pub fn ordered_chunks(&self) -> Vec<Chunk<N>> {
        self.chunk_members
            .iter()
            .map(|members| {
                Chunk::new(
                    members
                        .iter()
                        .map(|&member| self.nodes[member].clone())
                        .collect(),
                )
            })
            .collect()
    }

    /// A total order consistent with the chunk order.
    ///
    /// Nodes unknown to this analysis sort after every analyzed node and
    /// compare equal among themselves, so a stable sort leaves their
    /// relative order untouched.
    pub fn comparator(&self) -> impl Fn(&N, &N) -> Ordering + '_ {
        move |a, b| match (self.position_of(a), self.position_of(b)) {
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

    /// Materialize the acyclic chunk graph for this analysis.
    #[must_use]
    pub fn into_chunk_graph(self) -> ChunkGraph<N> {
        ChunkGraph::from_analysis(&self)
    }

    /// Nodes reachable from `seeds` along (or, reversed, against) the
    /// depends-on edges, seeds included. Seeds outside the snapshot are
    /// ignored.
    pub(crate) fn closure(&self, seeds: impl IntoIterator<Item = N>, reverse: bool) -> HashSet<N> {
        let reverse_edges = if reverse {
            let mut reversed: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
            for (from, targets) in self.edges.iter().enumerate() {
                for &to in targets {
                    reversed[to].push(from);
                }
            }
            Some(reversed)
        } else {
            None
        };
        let adjacency = reverse_edges.as_ref().unwrap_or(&self.edges);

        let mut visited = vec![false; self.nodes.len()];
        let mut frontier: Vec<usize> = Vec::new();
        for seed in seeds {
            if let Some(&index) = self.index_of.get(&seed)
                && !visited[index]
            {
                visited[index] = true;
                frontier.push(index);
            }
        }
        while let Some(current) = frontier.pop() {
            for &next in &adjacency[current] {
                if !visited[next] {
                    visited[next] = true;
                    frontier.push(next);
                }
            }
        }

        visited
            .iter()
            .enumerate()
            .filter(|&(_, &reached)| reached)
            .map(|(index, _)| self.nodes[index].clone())
            .collect()
    }
}
