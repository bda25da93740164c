//! Dependency reports for processed resources
//!
//! Builds a directed graph (resource → dependency) over a set of resource
//! holders and answers dependency and dependant queries for one resource.

use super::holder::ResourceHolder;
use crate::models::{DependencyScope, DependencySummary};
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Direction, Graph};
use std::collections::{BTreeSet, HashMap};

/// Dependency graph over processed resources, nodes are resource URIs
pub struct DependencyGraph {
    graph: Graph<String, (), Directed>,
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph, dependencies on URIs with no holder are dropped
    pub fn new<'h>(holders: impl IntoIterator<Item = &'h ResourceHolder>) -> Self {
        let holders: Vec<&ResourceHolder> = holders.into_iter().collect();
        let mut graph = Graph::<String, (), Directed>::new();
        let mut node_map = HashMap::new();

        for holder in &holders {
            let uri = holder.system_id();
            if !node_map.contains_key(&uri) {
                let node = graph.add_node(uri.clone());
                node_map.insert(uri, node);
            }
        }

        for holder in &holders {
            let source = node_map[&holder.system_id()];
            for dependency in holder.absolute_dependencies() {
                if let Some(&target) = node_map.get(dependency) {
                    graph.update_edge(source, target, ());
                }
            }
        }

        Self { graph, node_map }
    }

    /// Resources the given resource depends on
    pub fn dependencies(&self, scope: DependencyScope, uri: &str) -> BTreeSet<DependencySummary> {
        self.query(scope, uri, Direction::Outgoing)
    }

    /// Resources that depend on the given resource
    pub fn dependants(&self, scope: DependencyScope, uri: &str) -> BTreeSet<DependencySummary> {
        self.query(scope, uri, Direction::Incoming)
    }

    fn query(&self, scope: DependencyScope, uri: &str, direction: Direction) -> BTreeSet<DependencySummary> {
        let mut values = BTreeSet::new();
        if let Some(&root) = self.node_map.get(uri) {
            self.resolve_recursive(
                &mut values,
                root,
                root,
                direction,
                true,
                scope != DependencyScope::Direct,
            );
        }
        filter_by_scope(scope, &mut values);
        values
    }

    /// Record the neighbours of `node`, then expand the newly recorded ones.
    ///
    /// Neighbours are all recorded before any expansion so a resource that is
    /// both a direct and a transitive neighbour of the root is reported as
    /// direct. The root itself is never recorded.
    fn resolve_recursive(
        &self,
        values: &mut BTreeSet<DependencySummary>,
        root: NodeIndex,
        node: NodeIndex,
        direction: Direction,
        is_direct: bool,
        recursive: bool,
    ) {
        let mut to_process = Vec::new();
        for neighbor in self.graph.neighbors_directed(node, direction) {
            if neighbor == root {
                continue;
            }
            let summary = DependencySummary::new(self.graph[neighbor].clone(), !is_direct);
            if values.insert(summary) && recursive {
                to_process.push(neighbor);
            }
        }

        for neighbor in to_process {
            self.resolve_recursive(values, root, neighbor, direction, false, true);
        }
    }
}

/// Keep only the summaries matching the scope
pub fn filter_by_scope(scope: DependencyScope, summaries: &mut BTreeSet<DependencySummary>) {
    match scope {
        DependencyScope::All => {}
        DependencyScope::Direct => summaries.retain(|s| !s.is_transitive()),
        DependencyScope::Transitive => summaries.retain(|s| s.is_transitive()),
    }
}

/// Dependencies of a resource among the given resources, sorted by URI
pub fn get_dependencies<'h>(
    scope: DependencyScope,
    holder: &'h ResourceHolder,
    holders: impl IntoIterator<Item = &'h ResourceHolder>,
) -> BTreeSet<DependencySummary> {
    let graph = DependencyGraph::new(std::iter::once(holder).chain(holders));
    graph.dependencies(scope, &holder.system_id())
}

/// Dependants of a resource among the given resources, sorted by URI
pub fn get_dependants<'h>(
    scope: DependencyScope,
    holder: &'h ResourceHolder,
    holders: impl IntoIterator<Item = &'h ResourceHolder>,
) -> BTreeSet<DependencySummary> {
    let graph = DependencyGraph::new(std::iter::once(holder).chain(holders));
    graph.dependants(scope, &holder.system_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::UriResourceDocument;

    fn holder(uri: &str, dependencies: &[&str]) -> ResourceHolder {
        let mut holder = ResourceHolder::schema(
            UriResourceDocument::shared(format!("http://host/{}", uri), None, None),
            None,
            None,
        );
        for dependency in dependencies {
            holder.add_dependency(None, format!("http://host/{}", dependency));
        }
        holder
    }

    fn uris(summaries: &BTreeSet<DependencySummary>) -> Vec<(String, bool)> {
        summaries
            .iter()
            .map(|s| (s.uri().trim_start_matches("http://host/").to_string(), s.is_transitive()))
            .collect()
    }

    #[test]
    fn direct_wins_over_transitive() {
        // a -> b -> c and a -> c
        let holders = [holder("a", &["b", "c"]), holder("b", &["c"]), holder("c", &[])];
        let deps = get_dependencies(DependencyScope::All, &holders[0], &holders);
        assert_eq!(uris(&deps), vec![("b".into(), false), ("c".into(), false)]);
    }

    #[test]
    fn self_dependency_is_not_reported() {
        let holders = [holder("a", &["a", "b"]), holder("b", &[])];
        let deps = get_dependencies(DependencyScope::All, &holders[0], &holders);
        assert_eq!(uris(&deps), vec![("b".into(), false)]);
    }

    #[test]
    fn target_outside_the_set_is_included() {
        let holders = vec![holder("a", &["b"]), holder("b", &[])];
        let target = holder("c", &["a"]);
        let deps = get_dependencies(DependencyScope::All, &target, holders.iter());
        assert_eq!(uris(&deps), vec![("a".into(), false), ("b".into(), true)]);
        assert!(get_dependants(DependencyScope::All, &target, holders.iter()).is_empty());
    }

    #[test]
    fn unknown_target_has_no_dependants() {
        let holders = [holder("a", &["b"]), holder("b", &[])];
        let graph = DependencyGraph::new(&holders);
        assert!(graph.dependants(DependencyScope::All, "http://host/x").is_empty());
    }
}
