//! Project dependency graph
//!
//! Nodes live in an arena and are addressed by [`NodeId`]; an identity map
//! resolves names to ids. The root project is always node 0. Edges keep the
//! order in which dependencies were declared.

use crate::error::{BuildError, BuildResult};
use crate::project::ProjectNode;
use std::collections::{HashMap, HashSet};

/// Index of a node in a [`DependencyGraph`]
pub type NodeId = usize;

/// A node in the dependency graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphNode {
    /// Another project in the same build
    Project(ProjectNode),
    /// A prebuilt package
    Package {
        name: String,
        version: semver::Version,
    },
}

impl GraphNode {
    /// Identity of the node
    pub fn name(&self) -> &str {
        match self {
            Self::Project(project) => project.name(),
            Self::Package { name, .. } => name,
        }
    }

    /// The project, for project-type nodes
    pub fn as_project(&self) -> Option<&ProjectNode> {
        match self {
            Self::Project(project) => Some(project),
            Self::Package { .. } => None,
        }
    }

    pub fn is_project(&self) -> bool {
        matches!(self, Self::Project(_))
    }
}

/// Dependency graph rooted at the project being built
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<Vec<NodeId>>,
    index: HashMap<String, NodeId>,
}

impl DependencyGraph {
    /// Id of the root project
    pub const ROOT: NodeId = 0;

    /// Create a graph containing only the root project
    pub fn new(root: ProjectNode) -> Self {
        let mut index = HashMap::new();
        index.insert(root.name().to_string(), Self::ROOT);
        Self {
            nodes: vec![GraphNode::Project(root)],
            edges: vec![Vec::new()],
            index,
        }
    }

    /// Add a node, returning the id of the existing node if one has the same identity
    pub fn add_node(&mut self, node: GraphNode) -> NodeId {
        if let Some(&id) = self.index.get(node.name()) {
            return id;
        }
        let id = self.nodes.len();
        self.index.insert(node.name().to_string(), id);
        self.nodes.push(node);
        self.edges.push(Vec::new());
        id
    }

    /// Record that `from` depends on `to`
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        let edges = &mut self.edges[from];
        if !edges.contains(&to) {
            edges.push(to);
        }
    }

    /// The root project
    pub fn root(&self) -> &ProjectNode {
        match &self.nodes[Self::ROOT] {
            GraphNode::Project(project) => project,
            GraphNode::Package { .. } => unreachable!("graph root is always a project"),
        }
    }

    /// Whether `project` is the root of this graph
    pub fn is_root(&self, project: &ProjectNode) -> bool {
        self.root().name() == project.name()
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id]
    }

    /// Look up a node by identity
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// Direct dependencies of a node, in declaration order
    pub fn direct_dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.edges[id]
    }

    /// Direct dependencies of the root, in declaration order
    pub fn root_dependencies(&self) -> &[NodeId] {
        self.direct_dependencies(Self::ROOT)
    }

    /// Transitive project dependencies of `id` that can be compiled from source
    pub fn project_dependencies_with_sources(&self, id: NodeId) -> Vec<&ProjectNode> {
        let mut visited = HashSet::new();
        let mut projects = Vec::new();
        self.collect_projects(id, &mut visited, &mut projects);
        projects
    }

    fn collect_projects<'a>(
        &'a self,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        projects: &mut Vec<&'a ProjectNode>,
    ) {
        for &dependency in &self.edges[id] {
            if !visited.insert(dependency) {
                continue;
            }
            if let Some(project) = self.nodes[dependency].as_project() {
                if project.has_sources() {
                    projects.push(project);
                }
            }
            self.collect_projects(dependency, visited, projects);
        }
    }

    /// Projects whose incremental safety must be checked
    pub fn projects_to_check(&self, skip_dependencies: bool) -> Vec<&ProjectNode> {
        let mut projects = vec![self.root()];
        if !skip_dependencies {
            projects.extend(self.project_dependencies_with_sources(Self::ROOT));
        }
        projects
    }

    /// Node count, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Reject cycles between project nodes
    pub fn validate(&self) -> BuildResult<()> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for id in 0..self.nodes.len() {
            if let Some(cycle) = self.dfs_find_cycle(id, &mut visited, &mut rec_stack, &mut path) {
                return Err(BuildError::CircularDependency(cycle));
            }
        }
        Ok(())
    }

    /// DFS to find a cycle
    fn dfs_find_cycle(
        &self,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        rec_stack: &mut HashSet<NodeId>,
        path: &mut Vec<NodeId>,
    ) -> Option<String> {
        if rec_stack.contains(&id) {
            // Found cycle - extract the cycle from path
            let start = path.iter().position(|&n| n == id).unwrap_or(0);
            let mut names: Vec<&str> = path[start..]
                .iter()
                .map(|&n| self.nodes[n].name())
                .collect();
            names.push(self.nodes[id].name());
            return Some(names.join(" -> "));
        }

        if !visited.insert(id) {
            return None;
        }

        rec_stack.insert(id);
        path.push(id);

        for &dependency in &self.edges[id] {
            if let Some(cycle) = self.dfs_find_cycle(dependency, visited, rec_stack, path) {
                return Some(cycle);
            }
        }

        rec_stack.remove(&id);
        path.pop();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str) -> GraphNode {
        GraphNode::Project(project_node(name))
    }

    fn project_node(name: &str) -> ProjectNode {
        ProjectNode::without_sources(
            name,
            "1.0.0",
            format!("/src/{}/kiln.toml", name),
            "net10.0",
            None,
        )
    }

    fn package(name: &str) -> GraphNode {
        GraphNode::Package {
            name: name.to_string(),
            version: semver::Version::new(1, 0, 0),
        }
    }

    #[test]
    fn test_new_graph_has_root() {
        let graph = DependencyGraph::new(project_node("App"));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.root().name(), "App");
        assert!(graph.root_dependencies().is_empty());
        assert_eq!(graph.find("App"), Some(DependencyGraph::ROOT));
    }

    #[test]
    fn test_add_node_deduplicates_by_identity() {
        let mut graph = DependencyGraph::new(project_node("App"));
        let first = graph.add_node(package("Json"));
        let second = graph.add_node(package("Json"));
        assert_eq!(first, second);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_edges_keep_declaration_order() {
        let mut graph = DependencyGraph::new(project_node("App"));
        let b = graph.add_node(project("B"));
        let a = graph.add_node(project("A"));
        graph.add_edge(DependencyGraph::ROOT, b);
        graph.add_edge(DependencyGraph::ROOT, a);
        graph.add_edge(DependencyGraph::ROOT, b);

        assert_eq!(graph.root_dependencies(), &[b, a]);
    }

    #[test]
    fn test_validate_accepts_diamond() {
        let mut graph = DependencyGraph::new(project_node("App"));
        let a = graph.add_node(project("A"));
        let b = graph.add_node(project("B"));
        let core = graph.add_node(project("Core"));
        graph.add_edge(DependencyGraph::ROOT, a);
        graph.add_edge(DependencyGraph::ROOT, b);
        graph.add_edge(a, core);
        graph.add_edge(b, core);

        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_cycle() {
        let mut graph = DependencyGraph::new(project_node("App"));
        let a = graph.add_node(project("A"));
        let b = graph.add_node(project("B"));
        graph.add_edge(DependencyGraph::ROOT, a);
        graph.add_edge(a, b);
        graph.add_edge(b, a);

        match graph.validate() {
            Err(BuildError::CircularDependency(cycle)) => assert_eq!(cycle, "A -> B -> A"),
            other => panic!("Expected CircularDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_projects_without_sources_are_not_buildable() {
        let mut graph = DependencyGraph::new(project_node("App"));
        let prebuilt = graph.add_node(project("Prebuilt"));
        let json = graph.add_node(package("Json"));
        graph.add_edge(DependencyGraph::ROOT, prebuilt);
        graph.add_edge(DependencyGraph::ROOT, json);

        assert!(graph.project_dependencies_with_sources(DependencyGraph::ROOT).is_empty());
        assert_eq!(graph.projects_to_check(false).len(), 1);
        assert!(graph.node(json).as_project().is_none());
    }
}
