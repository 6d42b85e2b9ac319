//! Dependency build order
//!
//! Depth-first post-order from each of the root's direct dependencies, in
//! declaration order. Only projects with sources are emitted, each once.
use crate::graph::{DependencyGraph, NodeId};
use crate::project::ProjectNode;
use std::collections::HashSet;

/// Projects the root depends on, in the order they must be built
pub fn sort(graph: &DependencyGraph) -> Vec<&ProjectNode> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();

    for &dependency in graph.root_dependencies() {
        visit(graph, dependency, &mut visited, &mut order);
    }

    order
}

fn visit<'g>(
    graph: &'g DependencyGraph,
    id: NodeId,
    visited: &mut HashSet<NodeId>,
    order: &mut Vec<&'g ProjectNode>,
) {
    // Marked on entry, so a diamond is walked once and a cycle cannot recurse forever
    if id == DependencyGraph::ROOT || !visited.insert(id) {
        return;
    }

    for &dependency in graph.direct_dependencies(id) {
        visit(graph, dependency, visited, order);
    }

    if let Some(project) = graph.node(id).as_project() {
        if project.has_sources() {
            order.push(project);
        }
    }
}
