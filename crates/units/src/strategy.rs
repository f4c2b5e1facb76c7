//! Edge derivation between units
//!
//! A [`GraphView`] adapter turns a unit slice into the graph the chunk
//! analysis consumes. Two derivations exist: declared dependency lists
//! ([`DeclaredDepsGraph`]) and output-to-input tag overlap
//! ([`TagOverlapGraph`]). The [`EdgeStrategy`] trait is the seam that
//! binds a registry to one of them.

use std::collections::{HashMap, HashSet};

use strata_chunk_graph::GraphView;

use crate::{DeclaredDeps, TagSets, Unit};

/// View over a unit slice using each unit's declared dependency list.
pub struct DeclaredDepsGraph<'a, U: Unit> {
    units: &'a [U],
    by_id: HashMap<U::Id, &'a U>,
}

impl<'a, U: DeclaredDeps> DeclaredDepsGraph<'a, U> {
    /// Index the slice by unit id. The first unit wins on duplicates.
    pub fn new(units: &'a [U]) -> Self {
        let mut by_id = HashMap::with_capacity(units.len());
        for unit in units {
            by_id.entry(unit.id()).or_insert(unit);
        }
        Self { units, by_id }
    }
}

impl<U: DeclaredDeps> GraphView for DeclaredDepsGraph<'_, U> {
    type Node = U::Id;

    fn nodes(&self) -> impl Iterator<Item = U::Id> {
        self.units.iter().map(Unit::id)
    }

    fn depends_on(&self, node: &U::Id) -> impl Iterator<Item = U::Id> {
        self.by_id
            .get(node)
            .copied()
            .into_iter()
            .flat_map(|unit| unit.declared_dependencies())
    }
}

/// View over a unit slice deriving edges from tag overlap.
///
/// A unit depends on every unit whose output tags intersect its input
/// tags. Producers are indexed by tag once at construction, so edge
/// derivation is linear in declared tags rather than quadratic in
/// units. Edge order is deterministic: input tags in declaration
/// order, producers of each tag in slice order, first occurrence wins.
///
/// A unit that consumes a tag it also produces yields a self-edge;
/// chunk analysis drops it. Every derived edge targets a unit in the
/// slice, so this view cannot fail referential validation.
pub struct TagOverlapGraph<'a, U: TagSets> {
    units: &'a [U],
    by_id: HashMap<U::Id, &'a U>,
    producers: HashMap<U::Tag, Vec<U::Id>>,
}

impl<'a, U: TagSets> TagOverlapGraph<'a, U> {
    /// Build the producers-by-tag index over the slice.
    pub fn new(units: &'a [U]) -> Self {
        let mut by_id = HashMap::with_capacity(units.len());
        let mut producers: HashMap<U::Tag, Vec<U::Id>> = HashMap::new();

        for unit in units {
            by_id.entry(unit.id()).or_insert(unit);
            for tag in unit.output_tags() {
                producers.entry(tag).or_default().push(unit.id());
            }
        }

        Self {
            units,
            by_id,
            producers,
        }
    }
}

impl<U: TagSets> GraphView for TagOverlapGraph<'_, U> {
    type Node = U::Id;

    fn nodes(&self) -> impl Iterator<Item = U::Id> {
        self.units.iter().map(Unit::id)
    }

    fn depends_on(&self, node: &U::Id) -> impl Iterator<Item = U::Id> {
        let mut seen = HashSet::new();
        let mut deps = Vec::new();

        if let Some(unit) = self.by_id.get(node) {
            for tag in unit.input_tags() {
                if let Some(ids) = self.producers.get(&tag) {
                    for id in ids {
                        if seen.insert(id) {
                            deps.push(id.clone());
                        }
                    }
                }
            }
        }

        deps.into_iter()
    }
}

/// Binds a registry to one edge-derivation scheme.
pub trait EdgeStrategy<U: Unit> {
    /// Build the graph view used for analysis over the given units.
    fn view(units: &[U]) -> impl GraphView<Node = U::Id>;
}

/// Derive edges from each unit's declared dependency list.
pub struct DeclaredEdges;

impl<U: DeclaredDeps> EdgeStrategy<U> for DeclaredEdges {
    fn view(units: &[U]) -> impl GraphView<Node = U::Id> {
        DeclaredDepsGraph::new(units)
    }
}

/// Derive edges from output-to-input tag overlap.
pub struct TagOverlapEdges;

impl<U: TagSets> EdgeStrategy<U> for TagOverlapEdges {
    fn view(units: &[U]) -> impl GraphView<Node = U::Id> {
        TagOverlapGraph::new(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Module {
        name: &'static str,
        deps: Vec<&'static str>,
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

    #[derive(Debug, Clone)]
    struct Step {
        name: &'static str,
        inputs: Vec<&'static str>,
        outputs: Vec<&'static str>,
    }

    impl Unit for Step {
        type Id = &'static str;

        fn id(&self) -> &'static str {
            self.name
        }
    }

    impl TagSets for Step {
        type Tag = &'static str;

        fn input_tags(&self) -> impl Iterator<Item = &'static str> {
            self.inputs.iter().copied()
        }

        fn output_tags(&self) -> impl Iterator<Item = &'static str> {
            self.outputs.iter().copied()
        }
    }

    fn deps_of<G: GraphView>(view: &G, node: &G::Node) -> Vec<G::Node> {
        view.depends_on(node).collect()
    }

    #[test]
    fn declared_view_exposes_slice_order() {
        let modules = vec![
            Module {
                name: "core",
                deps: vec![],
            },
            Module {
                name: "api",
                deps: vec!["core"],
            },
        ];
        let view = DeclaredDepsGraph::new(&modules);

        let nodes: Vec<_> = view.nodes().collect();
        assert_eq!(nodes, vec!["core", "api"]);
        assert_eq!(deps_of(&view, &"api"), vec!["core"]);
        assert!(deps_of(&view, &"core").is_empty());
    }

    #[test]
    fn declared_view_unknown_id_has_no_deps() {
        let modules = vec![Module {
            name: "core",
            deps: vec![],
        }];
        let view = DeclaredDepsGraph::new(&modules);

        assert!(deps_of(&view, &"ghost").is_empty());
    }

    #[test]
    fn overlap_view_derives_edges_from_tags() {
        let steps = vec![
            Step {
                name: "javac",
                inputs: vec![],
                outputs: vec!["class"],
            },
            Step {
                name: "resources",
                inputs: vec![],
                outputs: vec!["resource"],
            },
            Step {
                name: "packaging",
                inputs: vec!["class", "resource"],
                outputs: vec!["archive"],
            },
        ];
        let view = TagOverlapGraph::new(&steps);

        assert_eq!(deps_of(&view, &"packaging"), vec!["javac", "resources"]);
        assert!(deps_of(&view, &"javac").is_empty());
        assert!(deps_of(&view, &"resources").is_empty());
    }

    #[test]
    fn overlap_view_orders_producers_by_slice_position() {
        let steps = vec![
            Step {
                name: "gen_b",
                inputs: vec![],
                outputs: vec!["stub"],
            },
            Step {
                name: "gen_a",
                inputs: vec![],
                outputs: vec!["stub"],
            },
            Step {
                name: "use",
                inputs: vec!["stub"],
                outputs: vec![],
            },
        ];
        let view = TagOverlapGraph::new(&steps);

        assert_eq!(deps_of(&view, &"use"), vec!["gen_b", "gen_a"]);
    }

    #[test]
    fn overlap_view_dedups_repeated_producers() {
        let steps = vec![
            Step {
                name: "gen",
                inputs: vec![],
                outputs: vec!["header", "source"],
            },
            Step {
                name: "build",
                inputs: vec!["header", "source"],
                outputs: vec![],
            },
        ];
        let view = TagOverlapGraph::new(&steps);

        // "gen" satisfies both inputs but appears once.
        assert_eq!(deps_of(&view, &"build"), vec!["gen"]);
    }

    #[test]
    fn overlap_view_keeps_self_edges() {
        let steps = vec![Step {
            name: "instrument",
            inputs: vec!["class"],
            outputs: vec!["class"],
        }];
        let view = TagOverlapGraph::new(&steps);

        assert_eq!(deps_of(&view, &"instrument"), vec!["instrument"]);
    }

    #[test]
    fn overlap_view_ignores_unproduced_tags() {
        let steps = vec![Step {
            name: "linker",
            inputs: vec!["object"],
            outputs: vec![],
        }];
        let view = TagOverlapGraph::new(&steps);

        assert!(deps_of(&view, &"linker").is_empty());
    }
}
