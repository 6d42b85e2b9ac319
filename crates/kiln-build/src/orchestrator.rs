//! Build orchestration
//!
//! Dependencies are compiled one at a time in sorted order, then the root.
//! The first failed compilation stops the build. Every project that was
//! looked at gets its tool version stamp refreshed, whether it was compiled,
//! skipped or failed.

use crate::cache::{write_stamp, ToolVersion};
use crate::compiler::{dependency_args, root_args, CompileInvoker};
use crate::error::{BuildError, BuildResult};
use crate::graph::{DependencyGraph, GraphNode};
use crate::oracle::StalenessOracle;
use crate::output::OutputPaths;
use crate::preconditions::{PreconditionCollector, PreconditionSet};
use crate::project::ProjectNode;
use crate::sort::sort;
use crate::workspace::{normalize_path, select_target};
use kiln_config::BuildOptions;
use kiln_lock::LibraryKind;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What happened to one project during a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOutcome {
    /// Skipped by the incremental check
    UpToDate,
    Compiled,
    Failed,
}

/// Outcome of one project, with the reason it was compiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReport {
    pub name: String,
    pub outcome: ProjectOutcome,
    pub reason: Option<String>,
}

/// Result of a build
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Projects in the order they were processed, root last
    pub projects: Vec<ProjectReport>,
    pub success: bool,
    pub incremental: bool,
    pub elapsed: Duration,
}

impl BuildSummary {
    fn new(incremental: bool) -> Self {
        Self {
            projects: Vec::new(),
            success: false,
            incremental,
            elapsed: Duration::ZERO,
        }
    }

    /// Outcome for a project by name
    pub fn outcome_of(&self, name: &str) -> Option<ProjectOutcome> {
        self.projects
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.outcome)
    }

    /// Number of projects that were compiled
    pub fn compiled_count(&self) -> usize {
        self.count(ProjectOutcome::Compiled)
    }

    /// Number of projects skipped as up to date
    pub fn up_to_date_count(&self) -> usize {
        self.count(ProjectOutcome::UpToDate)
    }

    fn count(&self, outcome: ProjectOutcome) -> usize {
        self.projects.iter().filter(|p| p.outcome == outcome).count()
    }

    fn record(&mut self, project: &ProjectNode, outcome: ProjectOutcome, reason: Option<String>) {
        self.projects.push(ProjectReport {
            name: project.name().to_string(),
            outcome,
            reason,
        });
    }
}

/// Whether a project is compiled, and the incremental reason if there is one
enum Decision {
    Skip,
    Compile(Option<String>),
}

/// Writes the tool version stamp of a project when dropped
struct StampGuard<'v> {
    project: String,
    path: PathBuf,
    version: Option<&'v ToolVersion>,
}

impl Drop for StampGuard<'_> {
    fn drop(&mut self) {
        match self.version {
            Some(version) => {
                if let Err(e) = write_stamp(&self.path, version) {
                    warn!("Failed to stamp project {} with the tool version: {}", self.project, e);
                }
            }
            None => debug!(
                "Project {} was not stamped with a tool version because the tool has no version file",
                self.project
            ),
        }
    }
}

/// Drives the compilation of a root project and its project dependencies
#[derive(Debug)]
pub struct BuildOrchestrator<'a> {
    graph: &'a DependencyGraph,
    options: &'a BuildOptions,
    invoker: &'a dyn CompileInvoker,
    preconditions: PreconditionSet,
    tool_version: Option<ToolVersion>,
}

impl<'a> BuildOrchestrator<'a> {
    /// Create an orchestrator, gathering incremental preconditions once
    pub fn new(
        graph: &'a DependencyGraph,
        options: &'a BuildOptions,
        invoker: &'a dyn CompileInvoker,
    ) -> Self {
        let preconditions = PreconditionCollector::new(&options.tool)
            .with_print(options.print_preconditions)
            .gather(
                &graph.projects_to_check(options.skip_dependencies),
                options.force_unsafe,
            );

        Self {
            graph,
            options,
            invoker,
            preconditions,
            tool_version: ToolVersion::current(&options.tool),
        }
    }

    /// Replace the gathered preconditions
    pub fn with_preconditions(mut self, preconditions: PreconditionSet) -> Self {
        self.preconditions = preconditions;
        self
    }

    /// Use `version` as the current tool version
    pub fn with_tool_version(mut self, version: Option<ToolVersion>) -> Self {
        self.tool_version = version;
        self
    }

    pub fn preconditions(&self) -> &PreconditionSet {
        &self.preconditions
    }

    /// Whether skipping up-to-date projects can be trusted
    pub fn is_safe_for_incremental(&self) -> bool {
        !self.options.force_unsafe && !self.preconditions.any()
    }

    /// Build incrementally when it is safe, fully otherwise
    pub fn build(&self) -> BuildResult<BuildSummary> {
        let incremental = self.is_safe_for_incremental();
        if !incremental {
            info!("{}", self.preconditions.log_message());
        }
        self.compile_with_summary(incremental)
    }

    /// Compile the graph; `Ok(false)` means a compilation failed
    pub fn compile(&self, incremental: bool) -> BuildResult<bool> {
        Ok(self.compile_with_summary(incremental)?.success)
    }

    /// Compile the graph and report what happened to each project
    pub fn compile_with_summary(&self, incremental: bool) -> BuildResult<BuildSummary> {
        let start = Instant::now();
        let mut summary = BuildSummary::new(incremental);

        self.create_output_directories()?;

        let success = self.compile_dependencies(incremental, &mut summary)?
            && self.compile_root(incremental, &mut summary)?;
        summary.success = success;
        summary.elapsed = start.elapsed();

        if summary.success {
            info!(
                "Build succeeded in {:.2}s ({} compiled, {} up to date)",
                summary.elapsed.as_secs_f64(),
                summary.compiled_count(),
                summary.up_to_date_count()
            );
        } else {
            error!("Build failed in {:.2}s", summary.elapsed.as_secs_f64());
        }
        Ok(summary)
    }

    fn compile_dependencies(&self, incremental: bool, summary: &mut BuildSummary) -> BuildResult<bool> {
        if self.options.skip_dependencies {
            return Ok(true);
        }

        let oracle = self.oracle();
        for dependency in sort(self.graph) {
            let _stamp = self.stamp_guard(dependency, false);

            let reason = match self.decide(&oracle, dependency, incremental)? {
                Decision::Compile(reason) => reason,
                Decision::Skip => {
                    summary.record(dependency, ProjectOutcome::UpToDate, None);
                    continue;
                }
            };

            let succeeded = self.invoke(dependency, &dependency_args(dependency, self.options))?;
            if !succeeded {
                summary.record(dependency, ProjectOutcome::Failed, reason);
                return Ok(false);
            }
            summary.record(dependency, ProjectOutcome::Compiled, reason);
        }

        Ok(true)
    }

    fn compile_root(&self, incremental: bool, summary: &mut BuildSummary) -> BuildResult<bool> {
        let root = self.graph.root();
        let _stamp = self.stamp_guard(root, true);

        let reason = match self.decide(&self.oracle(), root, incremental)? {
            Decision::Compile(reason) => reason,
            Decision::Skip => {
                summary.record(root, ProjectOutcome::UpToDate, None);
                return Ok(true);
            }
        };

        let succeeded = self.invoke(root, &root_args(root, self.options))?;
        if succeeded {
            self.make_runnable()?;
        }

        let outcome = if succeeded {
            ProjectOutcome::Compiled
        } else {
            ProjectOutcome::Failed
        };
        summary.record(root, outcome, reason);
        Ok(succeeded)
    }

    fn oracle(&self) -> StalenessOracle<'a> {
        StalenessOracle::new(self.options).with_tool_version(self.tool_version.clone())
    }

    fn decide(
        &self,
        oracle: &StalenessOracle<'_>,
        project: &ProjectNode,
        incremental: bool,
    ) -> BuildResult<Decision> {
        if !incremental {
            return Ok(Decision::Compile(None));
        }

        let result = oracle.needs_rebuild(project, self.graph)?;
        if result.needs_rebuild() {
            info!(
                "Project {} will be compiled because {}",
                project.display_name(),
                result.reason()
            );
            for item in result.items() {
                debug!("\t{}", item.display());
            }
            Ok(Decision::Compile(Some(result.reason().to_string())))
        } else {
            info!(
                "Project {} was previously compiled. Skipping compilation.",
                project.display_name()
            );
            Ok(Decision::Skip)
        }
    }

    fn invoke(&self, project: &ProjectNode, args: &[String]) -> BuildResult<bool> {
        info!("Compiling {}", project.display_name());
        debug!("Compile arguments: {}", args.join(" "));

        let code = self
            .invoker
            .invoke(args)
            .map_err(|error| BuildError::CompilerInvocation {
                command: self.invoker.command().to_path_buf(),
                error,
            })?;

        if code != 0 {
            error!(
                "Compilation of {} failed with exit code {}",
                project.display_name(),
                code
            );
        }
        Ok(code == 0)
    }

    fn stamp_guard(&self, project: &ProjectNode, is_root: bool) -> StampGuard<'_> {
        StampGuard {
            project: project.display_name(),
            path: OutputPaths::for_project(project, self.options, is_root).stamp_file(),
            version: self.tool_version.as_ref(),
        }
    }

    fn create_output_directories(&self) -> BuildResult<()> {
        for dir in [&self.options.output, &self.options.build_base_path]
            .into_iter()
            .flatten()
        {
            fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        }
        Ok(())
    }

    /// Lay the root's output out so that it can be run in place
    fn make_runnable(&self) -> BuildResult<()> {
        let root = self.graph.root();
        let paths = OutputPaths::for_project(root, self.options, true);

        copy_files(
            &paths.compilation_files(),
            paths.compilation_output(),
            paths.runtime_output(),
        )?;

        if !root.emits_entry_point() {
            return Ok(());
        }

        for dependency in self.graph.project_dependencies_with_sources(DependencyGraph::ROOT) {
            let dependency_paths = OutputPaths::for_project(dependency, self.options, false);
            copy_files(
                &dependency_paths.compilation_files(),
                dependency_paths.compilation_output(),
                paths.runtime_output(),
            )?;
        }

        write_json(&paths.deps_file(), &self.deps_document(root))?;
        write_json(
            &paths.runtime_config_file(),
            &json!({ "runtimeOptions": { "tfm": root.framework() } }),
        )
    }

    /// Runtime dependency manifest of the root, built from its lock target
    fn deps_document(&self, root: &ProjectNode) -> Value {
        let target_name = match root.runtime() {
            Some(runtime) => format!("{}/{}", root.framework(), runtime),
            None => root.framework().to_string(),
        };

        let mut target = Map::new();
        let mut libraries = Map::new();

        let root_dependencies: Map<String, Value> = self
            .graph
            .root_dependencies()
            .iter()
            .map(|&id| self.graph.node(id))
            .map(|node| (node.name().to_string(), Value::from(version_of(node))))
            .collect();
        let root_key = format!("{}/{}", root.name(), root.version());
        target.insert(
            root_key.clone(),
            json!({
                "dependencies": root_dependencies,
                "runtime": { format!("{}.dll", root.name()): {} },
            }),
        );
        libraries.insert(root_key, json!({ "type": "project" }));

        let lock_target = root
            .lock_file()
            .and_then(|lock| select_target(&lock.lock, root));
        for library in lock_target.iter().flat_map(|t| t.libraries.iter()) {
            let key = format!("{}/{}", library.name, library.version);
            let runtime: Map<String, Value> = match library.kind {
                LibraryKind::Project => [(format!("{}.dll", library.name), json!({}))]
                    .into_iter()
                    .collect(),
                LibraryKind::Package => library
                    .runtime
                    .iter()
                    .map(|file| (file.clone(), json!({})))
                    .collect(),
            };
            let kind = match library.kind {
                LibraryKind::Project => "project",
                LibraryKind::Package => "package",
            };
            target.insert(
                key.clone(),
                json!({ "dependencies": library.dependencies, "runtime": runtime }),
            );
            libraries.insert(key, json!({ "type": kind }));
        }

        json!({
            "runtimeTarget": { "name": target_name },
            "targets": { target_name.clone(): target },
            "libraries": libraries,
        })
    }
}

fn version_of(node: &GraphNode) -> String {
    match node {
        GraphNode::Project(project) => project.version().to_string(),
        GraphNode::Package { version, .. } => version.to_string(),
    }
}

/// Copy the files of `source` that exist into `dest`, keeping relative layout
fn copy_files(files: &[PathBuf], source: &Path, dest: &Path) -> BuildResult<()> {
    if normalize_path(source) == normalize_path(dest) {
        return Ok(());
    }

    for file in files {
        let Ok(relative) = file.strip_prefix(source) else {
            continue;
        };
        if !file.is_file() {
            debug!("Not copying {}: it was not produced", file.display());
            continue;
        }

        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::copy(file, &target).map_err(|e| BuildError::io(&target, e))?;
    }
    Ok(())
}

fn write_json(path: &Path, value: &Value) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| BuildError::CacheError(e.to_string()))?;
    fs::write(path, content).map_err(|e| BuildError::io(path, e))
}
