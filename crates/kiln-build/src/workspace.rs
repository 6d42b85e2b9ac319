//! Building the dependency graph from a root manifest and its lock file
//!
//! The root's direct dependencies come from its manifest, in declaration order.
//! Everything below them comes from the root lock file's target for the
//! selected framework and runtime: library kinds, versions and the ordered
//! dependency names of each library. Project libraries are located through
//! the lock file's project references.
//!
//! Manifest paths are normalized as they are loaded, so a project reached
//! through `../Core/kiln.toml` has the same directory as when it is the root.

use crate::error::BuildResult;
use crate::graph::{DependencyGraph, GraphNode, NodeId};
use crate::project::ProjectNode;
use kiln_config::BuildOptions;
use kiln_lock::{LibraryKind, LockFile, LockTarget};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Load the dependency graph for the project at `manifest_path`
///
/// Dependencies that cannot be resolved are reported and left out; a root
/// without a lock file yields a graph with no edges.
pub fn load_graph(manifest_path: &Path, options: &BuildOptions) -> BuildResult<DependencyGraph> {
    let manifest = normalize_path(manifest_path);
    let manifest_path = manifest.as_path();
    let root = ProjectNode::load(
        manifest_path,
        options.framework.as_deref(),
        options.runtime.as_deref(),
    )?;

    let direct: Vec<String> = root
        .descriptor()
        .map(|d| d.dependencies.keys().cloned().collect())
        .unwrap_or_default();
    let lock = root.lock_file().map(|l| l.lock.clone());
    let mut graph = DependencyGraph::new(root);

    let Some(lock) = lock else {
        if !direct.is_empty() {
            warn!(
                "Project {} has no lock file; its dependencies cannot be resolved",
                graph.root().name()
            );
        }
        return Ok(graph);
    };

    let Some(target) = select_target(&lock, graph.root()) else {
        warn!(
            "Lock file of {} has no target for {}",
            graph.root().name(),
            graph.root().framework()
        );
        return Ok(graph);
    };

    let mut resolver = Resolver {
        graph: &mut graph,
        lock: &lock,
        target,
        root_dir: manifest_dir(manifest_path),
        runtime: options.runtime.as_deref(),
    };
    for name in &direct {
        if let Some(id) = resolver.resolve(name, None)? {
            resolver.graph.add_edge(DependencyGraph::ROOT, id);
        }
    }

    graph.validate()?;
    debug!("Dependency graph of {} has {} nodes", graph.root().name(), graph.len());
    Ok(graph)
}

/// Prefer the runtime-specific target, fall back to the portable one
pub(crate) fn select_target<'a>(lock: &'a LockFile, root: &ProjectNode) -> Option<&'a LockTarget> {
    root.runtime()
        .and_then(|runtime| lock.target(root.framework(), Some(runtime)))
        .or_else(|| lock.target(root.framework(), None))
}

/// Canonical form of `path` when it exists, its lexically cleaned form otherwise
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    match dunce::canonicalize(path) {
        Ok(canonical) => canonical,
        Err(_) => clean_path(path),
    }
}

/// Drop `.` components and fold `..` into the preceding directory
fn clean_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match result.components().next_back() {
                Some(Component::Normal(_)) => {
                    result.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => result.push(".."),
            },
            other => result.push(other),
        }
    }
    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}

fn manifest_dir(manifest_path: &Path) -> &Path {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

struct Resolver<'g, 'l> {
    graph: &'g mut DependencyGraph,
    lock: &'l LockFile,
    target: &'l LockTarget,
    root_dir: &'l Path,
    runtime: Option<&'l str>,
}

impl Resolver<'_, '_> {
    fn resolve(&mut self, name: &str, dependent: Option<&str>) -> BuildResult<Option<NodeId>> {
        if let Some(id) = self.graph.find(name) {
            return Ok(Some(id));
        }

        let Some(library) = self.target.library(name) else {
            warn!(
                "Dependency {} of {} could not be resolved from the lock file",
                name,
                dependent.unwrap_or(self.graph.root().name())
            );
            return Ok(None);
        };

        let node = match library.kind {
            LibraryKind::Package => GraphNode::Package {
                name: library.name.clone(),
                version: library.version.clone(),
            },
            LibraryKind::Project => {
                let Some(reference) = self.lock.project_by_name(name) else {
                    warn!("Project reference {} is missing from the lock file", name);
                    return Ok(None);
                };
                let framework = library
                    .framework
                    .as_deref()
                    .unwrap_or(self.graph.root().framework());
                let manifest_path = normalize_path(&self.root_dir.join(&reference.path));

                let project = if manifest_path.is_file() {
                    ProjectNode::load(&manifest_path, Some(framework), self.runtime)?
                } else {
                    debug!(
                        "Project {} has no manifest at {}; treating it as prebuilt",
                        name,
                        manifest_path.display()
                    );
                    ProjectNode::without_sources(
                        name,
                        library.version.to_string(),
                        manifest_path,
                        framework,
                        self.runtime.map(str::to_string),
                    )
                };
                GraphNode::Project(project)
            }
        };

        // Insert before descending so that cycles terminate here and are reported by validate()
        let id = self.graph.add_node(node);
        for dependency in &library.dependencies {
            if let Some(child) = self.resolve(dependency, Some(name))? {
                self.graph.add_edge(id, child);
            }
        }
        Ok(Some(id))
    }
}
