//! Build options
//!
//! One immutable value describes how an invocation builds. It is created once
//! by the loader and then only borrowed, so a setting chosen for one project
//! can never leak into the next.

use std::path::{Path, PathBuf};

/// Configuration used when none is given
pub const DEFAULT_CONFIGURATION: &str = "Debug";

/// Build options for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Build configuration (Debug, Release, ...)
    pub configuration: String,
    /// Framework to build; the root's first framework when unset
    pub framework: Option<String>,
    /// Runtime identifier
    pub runtime: Option<String>,
    /// Final output directory for the root project
    pub output: Option<PathBuf>,
    /// Base directory for bin/ and obj/ trees
    pub build_base_path: Option<PathBuf>,
    /// Version suffix forwarded to the compiler
    pub version_suffix: Option<String>,
    /// Native compilation settings
    pub native: NativeOptions,
    /// Build only the root project
    pub skip_dependencies: bool,
    /// Never trust "no rebuild" verdicts
    pub force_unsafe: bool,
    /// Print every incremental precondition
    pub print_preconditions: bool,
    /// The tool running the build
    pub tool: ToolInfo,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            configuration: DEFAULT_CONFIGURATION.to_string(),
            framework: None,
            runtime: None,
            output: None,
            build_base_path: None,
            version_suffix: None,
            native: NativeOptions::default(),
            skip_dependencies: false,
            force_unsafe: false,
            print_preconditions: false,
            tool: ToolInfo::default(),
        }
    }
}

impl BuildOptions {
    /// Set configuration
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = configuration.into();
        self
    }

    /// Set framework
    pub fn with_framework(mut self, framework: impl Into<String>) -> Self {
        self.framework = Some(framework.into());
        self
    }

    /// Set runtime identifier
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    /// Set output directory
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set build base path
    pub fn with_build_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.build_base_path = Some(path.into());
        self
    }

    /// Set version suffix
    pub fn with_version_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.version_suffix = Some(suffix.into());
        self
    }

    /// Set native options
    pub fn with_native(mut self, native: NativeOptions) -> Self {
        self.native = native;
        self
    }

    /// Build only the root project
    pub fn with_skip_dependencies(mut self, skip: bool) -> Self {
        self.skip_dependencies = skip;
        self
    }

    /// Turn off incrementality
    pub fn with_force_unsafe(mut self, force: bool) -> Self {
        self.force_unsafe = force;
        self
    }

    /// Print incremental preconditions in full
    pub fn with_print_preconditions(mut self, print: bool) -> Self {
        self.print_preconditions = print;
        self
    }

    /// Set tool information
    pub fn with_tool(mut self, tool: ToolInfo) -> Self {
        self.tool = tool;
        self
    }
}

/// Native (ahead-of-time) compilation settings, root project only
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NativeOptions {
    pub enabled: bool,
    pub cpp: bool,
    pub cpp_compiler_flags: Option<String>,
    pub arch: Option<String>,
    pub ilc_args: Vec<String>,
    pub ilc_path: Option<PathBuf>,
    pub ilc_sdk_path: Option<PathBuf>,
}

/// Where the running tool lives and how it identifies itself
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInfo {
    /// Directory the tool's own commands are installed in
    pub install_dir: Option<PathBuf>,
    /// File describing the tool version; absent means "unknown version"
    pub version_file: Option<PathBuf>,
    /// Command invoked to compile one project
    pub compile_command: PathBuf,
}

impl Default for ToolInfo {
    fn default() -> Self {
        Self {
            install_dir: None,
            version_file: None,
            compile_command: PathBuf::from("kiln-compile"),
        }
    }
}

impl ToolInfo {
    /// File name of the version descriptor inside an install directory
    pub const VERSION_FILE_NAME: &'static str = ".version";

    /// Tool installed in `dir`, with its version file at the conventional location
    pub fn installed_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            version_file: Some(dir.join(Self::VERSION_FILE_NAME)),
            compile_command: dir.join("kiln-compile"),
            install_dir: Some(dir),
        }
    }

    /// Install directory, if known
    pub fn install_dir(&self) -> Option<&Path> {
        self.install_dir.as_deref()
    }
}
