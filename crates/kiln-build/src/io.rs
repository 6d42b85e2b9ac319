//! Compiler inputs and outputs
//!
//! [`compute_io`] lists every file a compilation reads and every file it is
//! expected to write. The sets are recomputed on every evaluation and compared
//! as sets, so ordering never matters.

use crate::error::{BuildError, BuildResult};
use crate::graph::DependencyGraph;
use crate::output::{resource_culture, OutputPaths};
use crate::project::ProjectNode;
use kiln_config::BuildOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Input and output path sets of one compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerIO {
    pub inputs: BTreeSet<PathBuf>,
    pub outputs: BTreeSet<PathBuf>,
}

/// Difference between two input sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDiff {
    /// Inputs present now but not before
    pub additions: Vec<PathBuf>,
    /// Inputs present before but not now
    pub deletions: Vec<PathBuf>,
}

impl InputDiff {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

impl CompilerIO {
    pub fn new(
        inputs: impl IntoIterator<Item = PathBuf>,
        outputs: impl IntoIterator<Item = PathBuf>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: outputs.into_iter().collect(),
        }
    }

    /// Compare these inputs against a previous snapshot
    pub fn diff_inputs(&self, previous: &CompilerIO) -> InputDiff {
        InputDiff {
            additions: self.inputs.difference(&previous.inputs).cloned().collect(),
            deletions: previous.inputs.difference(&self.inputs).cloned().collect(),
        }
    }
}

/// Compute the full input and output sets for compiling `project`
///
/// Fails with [`BuildError::MissingLockFile`] when the project has no lock file.
pub fn compute_io(
    project: &ProjectNode,
    graph: &DependencyGraph,
    options: &BuildOptions,
    is_root: bool,
) -> BuildResult<CompilerIO> {
    let mut io = CompilerIO::default();
    let paths = OutputPaths::for_project(project, options, is_root);

    io.inputs.insert(project.manifest_path().to_path_buf());

    // Package changes show up as lock file changes
    let lock_file = project
        .lock_file()
        .ok_or_else(|| BuildError::missing_lock_file(project.name()))?;
    io.inputs.insert(lock_file.path.clone());
    if let Some(export_path) = &lock_file.export_path {
        io.inputs.insert(export_path.clone());
    }

    io.inputs.extend(project.source_files()?);

    let id = graph
        .find(project.name())
        .ok_or_else(|| BuildError::project_not_found(project.name()))?;
    for dependency in graph.project_dependencies_with_sources(id) {
        io.inputs.extend(dependency.source_files()?);
    }

    io.outputs.extend(paths.compilation_files());
    if is_root && project.emits_entry_point() {
        io.outputs.extend(paths.runtime_files());
    }

    if let Some(key_file) = project.key_file() {
        io.inputs.insert(key_file);
    }

    for resource in project.resource_files()? {
        let output = match resource_culture(&resource) {
            Some(culture) => paths.satellite_assembly(&culture),
            None => paths.resource_output(&resource),
        };
        io.inputs.insert(resource);
        io.outputs.insert(output);
    }

    Ok(io)
}
