//! Incremental build preconditions
//!
//! Some project properties make a "nothing changed" verdict untrustworthy:
//! hook scripts and unknown compilers may read anything, and a tool found on
//! `PATH` may change without the build noticing. Preconditions never block a
//! build; they turn incrementality off for the whole invocation.

use crate::project::{ProjectNode, KNOWN_COMPILERS};
use kiln_config::ToolInfo;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

/// Hook script lists a project can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptHook {
    Precompile,
    Postcompile,
}

impl ScriptHook {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Precompile => "precompile",
            Self::Postcompile => "postcompile",
        }
    }
}

/// A condition that makes incremental compilation unsafe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// Incrementality was turned off explicitly
    ForceUnsafe,
    UnknownCompiler { project: String, compiler: String },
    PrePostScript { project: String, hook: ScriptHook },
    PathProbedTool { project: String, tool: String },
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForceUnsafe => write!(f, "[Forced Unsafe] incremental compilation was turned off"),
            Self::UnknownCompiler { project, compiler } => write!(
                f,
                "[Unknown Compiler] project {} uses compiler '{}'",
                project, compiler
            ),
            Self::PrePostScript { project, hook } => write!(
                f,
                "[Pre / Post Scripts] project {} declares {} scripts",
                project,
                hook.name()
            ),
            Self::PathProbedTool { project, tool } => write!(
                f,
                "[PATH Probing] project {} runs '{}' found on PATH",
                project, tool
            ),
        }
    }
}

/// Preconditions found for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreconditionSet {
    records: Vec<Precondition>,
    print: bool,
}

impl PreconditionSet {
    /// Create an empty set; `print` lists every record in [`log_message`](Self::log_message)
    pub fn new(print: bool) -> Self {
        Self {
            records: Vec::new(),
            print,
        }
    }

    pub fn add(&mut self, precondition: Precondition) {
        self.records.push(precondition);
    }

    pub fn records(&self) -> &[Precondition] {
        &self.records
    }

    /// Whether any precondition was detected
    pub fn any(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn is_forced_unsafe(&self) -> bool {
        self.records.contains(&Precondition::ForceUnsafe)
    }

    /// Message explaining why incrementality is off; empty when it is not
    pub fn log_message(&self) -> String {
        if self.is_forced_unsafe() {
            return "[Forced Unsafe]".to_string();
        }
        if !self.any() {
            return String::new();
        }
        if !self.print {
            return "(The compilation time can be improved. Run \"kiln build --build-profile\" for more information)"
                .to_string();
        }

        let mut message =
            String::from("Incremental compilation has been disabled due to the following project properties:");
        for record in &self.records {
            message.push_str("\n\t- ");
            message.push_str(&record.to_string());
        }
        message
    }
}

/// How a command invoked by the compile step is found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResolution {
    /// Inside the tool's own install directory
    Pinned(PathBuf),
    /// Through the `PATH` environment variable
    Path(PathBuf),
    NotFound,
}

/// Collects preconditions for the projects of one build
#[derive(Debug, Clone)]
pub struct PreconditionCollector {
    install_dir: Option<PathBuf>,
    search_path: Option<OsString>,
    print: bool,
}

impl PreconditionCollector {
    /// Collector resolving commands against `tool` and the process `PATH`
    pub fn new(tool: &ToolInfo) -> Self {
        Self {
            install_dir: tool.install_dir.clone(),
            search_path: env::var_os("PATH"),
            print: false,
        }
    }

    /// List every record in the composed message
    pub fn with_print(mut self, print: bool) -> Self {
        self.print = print;
        self
    }

    /// Resolve commands against `search_path` instead of the process `PATH`
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Gather preconditions for `projects`
    pub fn gather(&self, projects: &[&ProjectNode], force_unsafe: bool) -> PreconditionSet {
        let mut preconditions = PreconditionSet::new(self.print);

        if force_unsafe {
            preconditions.add(Precondition::ForceUnsafe);
        }

        for project in projects {
            self.collect_script_preconditions(project, &mut preconditions);
            self.collect_compiler_preconditions(project, &mut preconditions);
            self.collect_path_probing_preconditions(project, &mut preconditions);
        }

        preconditions
    }

    fn collect_script_preconditions(&self, project: &ProjectNode, preconditions: &mut PreconditionSet) {
        if !project.precompile_scripts().is_empty() {
            preconditions.add(Precondition::PrePostScript {
                project: project.name().to_string(),
                hook: ScriptHook::Precompile,
            });
        }
        if !project.postcompile_scripts().is_empty() {
            preconditions.add(Precondition::PrePostScript {
                project: project.name().to_string(),
                hook: ScriptHook::Postcompile,
            });
        }
    }

    fn collect_compiler_preconditions(&self, project: &ProjectNode, preconditions: &mut PreconditionSet) {
        if let Some(compiler) = project.compiler() {
            if !KNOWN_COMPILERS.contains(&compiler) {
                preconditions.add(Precondition::UnknownCompiler {
                    project: project.name().to_string(),
                    compiler: compiler.to_string(),
                });
            }
        }
    }

    fn collect_path_probing_preconditions(
        &self,
        project: &ProjectNode,
        preconditions: &mut PreconditionSet,
    ) {
        for command in commands_invoked_by_compile(project) {
            if let CommandResolution::Path(_) = self.resolve_command(&command) {
                preconditions.add(Precondition::PathProbedTool {
                    project: project.name().to_string(),
                    tool: command,
                });
            }
        }
    }

    /// Find `command` in the install directory first, then on the search path
    pub fn resolve_command(&self, command: &str) -> CommandResolution {
        let file_name = format!("{}{}", command, env::consts::EXE_SUFFIX);

        if let Some(dir) = &self.install_dir {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                return CommandResolution::Pinned(candidate);
            }
        }

        match self
            .search_path
            .as_deref()
            .and_then(|path| find_on_path(path, &file_name))
        {
            Some(found) => CommandResolution::Path(found),
            None => CommandResolution::NotFound,
        }
    }
}

/// Commands the compile step runs for a project
pub fn commands_invoked_by_compile(project: &ProjectNode) -> Vec<String> {
    let Some(compiler) = project.compiler() else {
        return Vec::new();
    };

    let mut commands = vec![format!("compile-{}", compiler)];
    let has_resources = project
        .resource_files()
        .map(|files| !files.is_empty())
        .unwrap_or(false);
    if has_resources {
        commands.push("resgen".to_string());
    }
    commands
}

fn find_on_path(search_path: &OsStr, file_name: &str) -> Option<PathBuf> {
    env::split_paths(search_path)
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project(dir: &Path, extra: &str) -> ProjectNode {
        let manifest = dir.join("kiln.toml");
        fs::write(
            &manifest,
            format!(
                "[project]\nname = \"App\"\nversion = \"1.0.0\"\nframeworks = [\"net10.0\"]\n{}",
                extra
            ),
        )
        .unwrap();
        ProjectNode::load(&manifest, None, None).unwrap()
    }

    fn collector() -> PreconditionCollector {
        PreconditionCollector::new(&ToolInfo::default()).with_search_path("")
    }

    #[test]
    fn test_clean_project_has_no_preconditions() {
        let dir = TempDir::new().unwrap();
        let node = project(dir.path(), "");

        let preconditions = collector().gather(&[&node], false);
        assert!(!preconditions.any());
        assert_eq!(preconditions.log_message(), "");
    }

    #[test]
    fn test_force_unsafe_is_always_recorded() {
        let preconditions = collector().gather(&[], true);
        assert_eq!(preconditions.records(), &[Precondition::ForceUnsafe]);
        assert_eq!(preconditions.log_message(), "[Forced Unsafe]");
    }

    #[test]
    fn test_unknown_compiler_and_scripts() {
        let dir = TempDir::new().unwrap();
        let node = project(
            dir.path(),
            "[compile]\ncompiler = \"mycc\"\n\n[scripts]\nprecompile = [\"gen\"]\npostcompile = [\"sign\"]\n",
        );

        let preconditions = collector().gather(&[&node], false);
        assert_eq!(
            preconditions.records(),
            &[
                Precondition::PrePostScript {
                    project: "App".to_string(),
                    hook: ScriptHook::Precompile
                },
                Precondition::PrePostScript {
                    project: "App".to_string(),
                    hook: ScriptHook::Postcompile
                },
                Precondition::UnknownCompiler {
                    project: "App".to_string(),
                    compiler: "mycc".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_message_lists_records_when_printing() {
        let dir = TempDir::new().unwrap();
        let node = project(dir.path(), "[compile]\ncompiler = \"mycc\"\n");

        let hidden = collector().gather(&[&node], false).log_message();
        assert!(hidden.contains("--build-profile"));

        let printed = collector().with_print(true).gather(&[&node], false).log_message();
        assert!(printed.starts_with("Incremental compilation has been disabled"));
        assert!(printed.contains("mycc"));
    }

    #[test]
    fn test_path_probed_tool_detected() {
        let dir = TempDir::new().unwrap();
        let node = project(dir.path(), "");
        let bin = dir.path().join("bin-on-path");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join(format!("compile-csc{}", env::consts::EXE_SUFFIX)), "").unwrap();

        let preconditions = PreconditionCollector::new(&ToolInfo::default())
            .with_search_path(bin.as_os_str())
            .gather(&[&node], false);
        assert_eq!(
            preconditions.records(),
            &[Precondition::PathProbedTool {
                project: "App".to_string(),
                tool: "compile-csc".to_string()
            }]
        );
    }

    #[test]
    fn test_pinned_tool_is_not_a_precondition() {
        let dir = TempDir::new().unwrap();
        let node = project(dir.path(), "");
        let install = dir.path().join("install");
        fs::create_dir_all(&install).unwrap();
        let file_name = format!("compile-csc{}", env::consts::EXE_SUFFIX);
        fs::write(install.join(&file_name), "").unwrap();

        let collector = PreconditionCollector::new(&ToolInfo::installed_at(&install))
            .with_search_path(install.as_os_str());
        assert_eq!(
            collector.resolve_command("compile-csc"),
            CommandResolution::Pinned(install.join(&file_name))
        );
        assert!(!collector.gather(&[&node], false).any());
    }

    #[test]
    fn test_resources_add_resgen() {
        let dir = TempDir::new().unwrap();
        let node = project(dir.path(), "");
        assert_eq!(commands_invoked_by_compile(&node), vec!["compile-csc"]);

        fs::write(dir.path().join("Strings.resx"), "").unwrap();
        assert_eq!(
            commands_invoked_by_compile(&node),
            vec!["compile-csc", "resgen"]
        );
    }
}
