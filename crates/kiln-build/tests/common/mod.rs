//! Shared fixtures for build tests
//!
//! A [`Workspace`] is a temporary directory of sibling projects that all share
//! one lock graph. [`FakeCompiler`] stands in for the external compiler and
//! writes each project's compilation files when invoked.

#![allow(dead_code)]

use filetime::{set_file_mtime, FileTime};
use kiln_build::{CompileInvoker, DependencyGraph, OutputPaths, ProjectNode};
use kiln_config::BuildOptions;
use kiln_lock::{LockFile, LockTarget, ProjectReference, TargetLibrary, LOCK_FILE_NAME};
use semver::Version;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use walkdir::WalkDir;

pub use pretty_assertions::assert_eq;

pub const FRAMEWORK: &str = "net10.0";

/// Temporary tree of projects `<root>/<Name>/kiln.toml`
pub struct Workspace {
    dir: TempDir,
    root: String,
}

impl Workspace {
    /// Create projects from `(name, direct dependencies)` pairs; the first one is the root
    pub fn new(projects: &[(&str, &[&str])]) -> Self {
        Self::with_manifest_extras(projects, &[])
    }

    /// Like [`Workspace::new`], appending TOML to the manifests of the named projects
    pub fn with_manifest_extras(projects: &[(&str, &[&str])], extras: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let workspace = Self {
            dir,
            root: projects[0].0.to_string(),
        };

        for (name, dependencies) in projects {
            let extra = extras
                .iter()
                .find(|(project, _)| project == name)
                .map(|(_, extra)| *extra)
                .unwrap_or("");
            workspace.write_manifest(name, dependencies, extra);
            workspace.write_source(name, &format!("{}.cs", name), "class Code {}");
        }

        let lock = lock_for(projects);
        for (name, _) in projects {
            lock.write_to_file(&workspace.project_dir(name).join(LOCK_FILE_NAME))
                .unwrap();
        }

        workspace.age_all();
        workspace
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.project_dir(name).join("kiln.toml")
    }

    pub fn root_manifest(&self) -> PathBuf {
        self.manifest_path(&self.root)
    }

    /// Load the graph of the root project
    pub fn graph(&self, options: &BuildOptions) -> DependencyGraph {
        kiln_build::load_graph(&self.root_manifest(), options).unwrap()
    }

    /// Write a source file inside a project
    pub fn write_source(&self, project: &str, file: &str, content: &str) -> PathBuf {
        let path = self.project_dir(project).join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Move every file in the workspace an hour into the past
    pub fn age_all(&self) {
        let past = SystemTime::now() - Duration::from_secs(3600);
        for entry in WalkDir::new(self.dir.path()).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                set_mtime(entry.path(), past);
            }
        }
    }

    fn write_manifest(&self, name: &str, dependencies: &[&str], extra: &str) {
        let mut manifest = format!(
            "[project]\nname = \"{}\"\nversion = \"1.0.0\"\nframeworks = [\"{}\"]\n",
            name, FRAMEWORK
        );
        manifest.push_str(extra);
        manifest.push_str("\n[dependencies]\n");
        for dependency in dependencies {
            manifest.push_str(&format!(
                "{} = {{ path = \"../{}\" }}\n",
                dependency, dependency
            ));
        }

        let dir = self.project_dir(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("kiln.toml"), manifest).unwrap();
    }
}

/// One lock graph describing every project of the workspace
fn lock_for(projects: &[(&str, &[&str])]) -> LockFile {
    let mut lock = LockFile::new();
    let mut target = LockTarget::new(FRAMEWORK, None);
    for (name, dependencies) in projects {
        lock.projects.push(ProjectReference {
            path: PathBuf::from(format!("../{}/kiln.toml", name)),
            name: name.to_string(),
        });
        target = target.with_library(
            TargetLibrary::project(*name, Version::new(1, 0, 0), FRAMEWORK)
                .with_dependencies(dependencies.iter().copied()),
        );
    }
    lock.targets.push(target);
    lock
}

/// Project node of `graph` by name
pub fn project<'g>(graph: &'g DependencyGraph, name: &str) -> &'g ProjectNode {
    graph
        .find(name)
        .and_then(|id| graph.node(id).as_project())
        .unwrap_or_else(|| panic!("project {} is not in the graph", name))
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    set_file_mtime(path, FileTime::from_system_time(time)).unwrap();
}

/// Compiler stand-in that writes the assemblies the build expects
#[derive(Debug, Default)]
pub struct FakeCompiler {
    /// Project directory argument -> (project name, files to write)
    projects: HashMap<String, (String, Vec<PathBuf>)>,
    failing: HashSet<String>,
    invocations: RefCell<Vec<Vec<String>>>,
}

impl FakeCompiler {
    /// Fake compiler for the root and every project dependency of `graph`
    pub fn for_graph(graph: &DependencyGraph, options: &BuildOptions) -> Self {
        let mut compiler = Self::default();
        let root = graph.root();
        let dependencies = graph.project_dependencies_with_sources(DependencyGraph::ROOT);

        for project in std::iter::once(root).chain(dependencies) {
            let outputs = OutputPaths::for_project(project, options, graph.is_root(project))
                .compilation_files();
            compiler.projects.insert(
                project.dir().display().to_string(),
                (project.name().to_string(), outputs),
            );
        }
        compiler
    }

    /// Make compilations of `project` exit with a non-zero code
    pub fn failing_on(mut self, project: &str) -> Self {
        self.failing.insert(project.to_string());
        self
    }

    /// Names of the projects the compiler was run for, in order
    pub fn invoked(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .filter_map(|args| self.project_of(args))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Raw argument lists of every invocation
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.borrow().clone()
    }

    pub fn reset(&self) {
        self.invocations.borrow_mut().clear();
    }

    fn project_of(&self, args: &[String]) -> Option<&(String, Vec<PathBuf>)> {
        args.iter().find_map(|arg| self.projects.get(arg))
    }
}

impl CompileInvoker for FakeCompiler {
    fn invoke(&self, args: &[String]) -> io::Result<i32> {
        self.invocations.borrow_mut().push(args.to_vec());

        let Some((name, outputs)) = self.project_of(args) else {
            return Ok(2);
        };
        if self.failing.contains(name) {
            return Ok(1);
        }

        for output in outputs {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(output, format!("compiled {}", name))?;
        }
        Ok(0)
    }

    fn command(&self) -> &Path {
        Path::new("fake-compile")
    }
}
