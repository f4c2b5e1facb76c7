//! Chunks of mutually dependent nodes.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A non-empty group of nodes scheduled as a single entity.
///
/// Every chunk corresponds to exactly one strongly connected component of
/// the analyzed graph: a node outside any cycle forms a singleton chunk,
/// while a dependency cycle collapses into one chunk holding all of its
/// nodes. Chunks are immutable; mutating the underlying node universe
/// means re-running the analysis.
///
/// Equality and hashing are defined over the member set, so two chunks
/// with the same membership compare equal regardless of member order.
#[derive(Clone)]
pub struct Chunk<N> {
    nodes: Vec<N>,
}

impl<N> Chunk<N> {
    pub(crate) fn new(nodes: Vec<N>) -> Self {
        debug_assert!(!nodes.is_empty(), "a chunk holds at least one node");
        Self { nodes }
    }

    /// Number of nodes in this chunk.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the chunk has no members. Analysis never produces empty
    /// chunks; this exists as the customary companion of [`Chunk::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether this chunk consists of exactly one node.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.nodes.len() == 1
    }

    /// The members in the enumeration order of the analyzed snapshot.
    #[must_use]
    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// Iterate over the members.
    pub fn iter(&self) -> std::slice::Iter<'_, N> {
        self.nodes.iter()
    }

    /// The single member of a singleton chunk, or `None` for larger ones.
    #[must_use]
    pub fn single(&self) -> Option<&N> {
        if self.nodes.len() == 1 {
            self.nodes.first()
        } else {
            None
        }
    }

    /// Consume the chunk, returning its members.
    #[must_use]
    pub fn into_nodes(self) -> Vec<N> {
        self.nodes
    }
}

impl<N: PartialEq> Chunk<N> {
    /// Whether `node` is a member of this chunk.
    pub fn contains(&self, node: &N) -> bool {
        self.nodes.iter().any(|n| n == node)
    }
}

impl<'a, N> IntoIterator for &'a Chunk<N> {
    type Item = &'a N;
    type IntoIter = std::slice::Iter<'a, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl<N: Eq + Hash> PartialEq for Chunk<N> {
    fn eq(&self, other: &Self) -> bool {
        if self.nodes.len() != other.nodes.len() {
            return false;
        }
        let members: HashSet<&N> = self.nodes.iter().collect();
        other.nodes.iter().all(|node| members.contains(node))
    }
}

impl<N: Eq + Hash> Eq for Chunk<N> {}

impl<N: Hash> Hash for Chunk<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Member order must not influence the hash, so per-element hashes
        // are combined with a commutative operation.
        let mut combined: u64 = 0;
        for node in &self.nodes {
            let mut hasher = DefaultHasher::new();
            node.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        state.write_usize(self.nodes.len());
        state.write_u64(combined);
    }
}

impl<N: fmt::Debug> fmt::Debug for Chunk<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk")?;
        f.debug_set().entries(&self.nodes).finish()
    }
}
