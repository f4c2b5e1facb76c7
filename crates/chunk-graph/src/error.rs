//! Error types for chunk graph analysis.

use thiserror::Error;

/// Result type for chunk graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while analyzing a dependency graph.
///
/// An empty graph is never an error; analyzing it yields an empty,
/// trivially acyclic result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A node declared a dependency on something outside the node set.
    ///
    /// Detected by validating every edge before the traversal starts, so
    /// a misconfigured view fails fast instead of producing a schedule
    /// that silently ignores edges.
    #[error("dependency edges reference undeclared nodes: {}", render_missing(.missing))]
    UndeclaredDependencies {
        /// Every (dependent, undeclared target) pair, in declaration order.
        missing: Vec<(String, String)>,
    },

    /// An operation that requires a strictly acyclic graph was given a
    /// graph containing at least one dependency cycle.
    ///
    /// Raised by node-level linearization; chunk-level schedules tolerate
    /// cycles and never produce this. No partial or best-effort order is
    /// returned alongside it.
    #[error("dependency cycles where an acyclic graph was required: {}", render_cycles(.cycles))]
    CycleDetected {
        /// Member lists of every chunk with more than one node.
        cycles: Vec<Vec<String>>,
    },
}

fn render_missing(missing: &[(String, String)]) -> String {
    missing
        .iter()
        .map(|(node, dep)| format!("{node} -> {dep}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|members| format!("[{}]", members.join(", ")))
        .collect::<Vec<_>>()
        .join(", ")
}
