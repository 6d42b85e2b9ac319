//! Rebuild decisions
//!
//! [`StalenessOracle::needs_rebuild`] runs four checks in order and stops at
//! the first one that asks for a rebuild:
//! 1. the tool version changed since the project was last built
//! 2. inputs or outputs are empty or missing on disk
//! 3. the input set differs from the cached one
//! 4. an input is at least as new as the oldest output
//!
//! Every evaluation overwrites the project's incremental cache, whatever the
//! verdict.

use crate::cache::{read_stamp, IncrementalCache, ToolVersion};
use crate::error::BuildResult;
use crate::graph::DependencyGraph;
use crate::io::{compute_io, CompilerIO};
use crate::output::OutputPaths;
use crate::project::ProjectNode;
use kiln_config::BuildOptions;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Outcome of a rebuild check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalResult {
    needs_rebuild: bool,
    reason: String,
    items: Vec<PathBuf>,
}

impl IncrementalResult {
    /// Nothing changed
    pub fn no_rebuild() -> Self {
        Self {
            needs_rebuild: false,
            reason: String::new(),
            items: Vec::new(),
        }
    }

    pub fn rebuild(reason: impl Into<String>) -> Self {
        Self::rebuild_with_items(reason, Vec::new())
    }

    pub fn rebuild_with_items(reason: impl Into<String>, items: Vec<PathBuf>) -> Self {
        Self {
            needs_rebuild: true,
            reason: reason.into(),
            items,
        }
    }

    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Paths that triggered the rebuild
    pub fn items(&self) -> &[PathBuf] {
        &self.items
    }
}

/// Decides whether projects must be recompiled
#[derive(Debug, Clone)]
pub struct StalenessOracle<'a> {
    options: &'a BuildOptions,
    tool_version: Option<ToolVersion>,
}

impl<'a> StalenessOracle<'a> {
    /// Oracle comparing against the version of the tool in `options`
    pub fn new(options: &'a BuildOptions) -> Self {
        Self {
            options,
            tool_version: ToolVersion::current(&options.tool),
        }
    }

    /// Use `version` as the current tool version
    pub fn with_tool_version(mut self, version: Option<ToolVersion>) -> Self {
        self.tool_version = version;
        self
    }

    /// Decide whether `project` needs to be compiled, refreshing its cache
    pub fn needs_rebuild(
        &self,
        project: &ProjectNode,
        graph: &DependencyGraph,
    ) -> BuildResult<IncrementalResult> {
        let is_root = graph.is_root(project);
        let paths = OutputPaths::for_project(project, self.options, is_root);
        let compiler_io = compute_io(project, graph, self.options, is_root)?;

        let result = self.evaluate(&paths, &compiler_io);

        IncrementalCache::new(compiler_io).write_to_file(&paths.cache_file())?;
        Ok(result)
    }

    fn evaluate(&self, paths: &OutputPaths, compiler_io: &CompilerIO) -> IncrementalResult {
        let result = self.tool_changed(paths);
        if result.needs_rebuild() {
            return result;
        }

        let result = input_items_changed(paths, compiler_io);
        if result.needs_rebuild() {
            return result;
        }

        timestamps_changed(compiler_io)
    }

    fn tool_changed(&self, paths: &OutputPaths) -> IncrementalResult {
        // Without both versions there is nothing to compare
        let Some(current) = &self.tool_version else {
            return IncrementalResult::no_rebuild();
        };
        let Some(previous) = read_stamp(&paths.stamp_file()) else {
            return IncrementalResult::no_rebuild();
        };

        if current.matches(&previous) {
            IncrementalResult::no_rebuild()
        } else {
            IncrementalResult::rebuild("the version or bitness of the tool changed since the last build")
        }
    }
}

fn input_items_changed(paths: &OutputPaths, compiler_io: &CompilerIO) -> IncrementalResult {
    if compiler_io.inputs.is_empty() {
        return IncrementalResult::rebuild("the project has no inputs");
    }
    if compiler_io.outputs.is_empty() {
        return IncrementalResult::rebuild("the project has no outputs");
    }

    let result = check_missing(&compiler_io.inputs, "inputs");
    if result.needs_rebuild() {
        return result;
    }
    let result = check_missing(&compiler_io.outputs, "outputs");
    if result.needs_rebuild() {
        return result;
    }

    let Some(cache) = IncrementalCache::read_from_file(&paths.cache_file()) else {
        return IncrementalResult::no_rebuild();
    };

    let diff = compiler_io.diff_inputs(&cache.compiler_io);
    if !diff.deletions.is_empty() {
        return IncrementalResult::rebuild_with_items("input items removed from last build", diff.deletions);
    }
    if !diff.additions.is_empty() {
        return IncrementalResult::rebuild_with_items("input items added from last build", diff.additions);
    }

    IncrementalResult::no_rebuild()
}

fn check_missing<'p>(items: impl IntoIterator<Item = &'p PathBuf>, kind: &str) -> IncrementalResult {
    let missing: Vec<PathBuf> = items.into_iter().filter(|p| !p.is_file()).cloned().collect();
    if missing.is_empty() {
        IncrementalResult::no_rebuild()
    } else {
        IncrementalResult::rebuild_with_items(format!("expected {} are missing", kind), missing)
    }
}

fn timestamps_changed(compiler_io: &CompilerIO) -> IncrementalResult {
    let Some(oldest_output) = compiler_io.outputs.iter().filter_map(|p| modified(p)).min() else {
        return IncrementalResult::rebuild("the project has no outputs");
    };

    // An input with an unreadable timestamp counts as modified
    let modified_inputs: Vec<PathBuf> = compiler_io
        .inputs
        .iter()
        .filter(|p| modified(p).map_or(true, |time| time >= oldest_output))
        .cloned()
        .collect();

    if modified_inputs.is_empty() {
        IncrementalResult::no_rebuild()
    } else {
        IncrementalResult::rebuild_with_items("inputs were modified", modified_inputs)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
