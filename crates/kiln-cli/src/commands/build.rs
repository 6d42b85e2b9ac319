//! Build command - incremental build of a project and its project references

use anyhow::{Context, Result};
use clap::Args;
use kiln_build::{load_graph, BuildOrchestrator, ProcessCompileInvoker};
use kiln_config::{
    BuildDefaults, NativeOptions, OptionOverrides, OptionsLoader, ProjectManifest, ToolInfo,
    MANIFEST_FILE_NAME,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Build command arguments
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Project directory or manifest file
    #[arg(default_value = ".")]
    pub project: PathBuf,
    /// Configuration to build (default: Debug)
    #[arg(long, short = 'c')]
    pub configuration: Option<String>,
    /// Target framework to build
    #[arg(long, short = 'f')]
    pub framework: Option<String>,
    /// Target runtime to build
    #[arg(long, short = 'r')]
    pub runtime: Option<String>,
    /// Output directory of the root project
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
    /// Directory for intermediate and output files of every project
    #[arg(long, short = 'b')]
    pub build_base_path: Option<PathBuf>,
    /// Suffix for the version of the built assemblies
    #[arg(long)]
    pub version_suffix: Option<String>,
    /// Compile the root project to native code
    #[arg(long)]
    pub native: bool,
    /// Generate C++ when compiling natively
    #[arg(long)]
    pub cpp: bool,
    /// Extra flags for the C++ compiler
    #[arg(long = "cppcompilerflags", allow_hyphen_values = true)]
    pub cpp_compiler_flags: Option<String>,
    /// Native target architecture
    #[arg(long)]
    pub arch: Option<String>,
    /// Argument passed to the native compiler (repeatable)
    #[arg(long = "ilcarg", allow_hyphen_values = true)]
    pub ilc_args: Vec<String>,
    /// Path to the native compiler
    #[arg(long = "ilcpath")]
    pub ilc_path: Option<PathBuf>,
    /// Path to the native compiler SDK
    #[arg(long = "ilcsdkpath")]
    pub ilc_sdk_path: Option<PathBuf>,
    /// Only build the root project
    #[arg(long)]
    pub no_dependencies: bool,
    /// Compile every project, even unchanged ones
    #[arg(long)]
    pub no_incremental: bool,
    /// Print every project property that disables incremental builds
    #[arg(long)]
    pub build_profile: bool,
}

impl BuildArgs {
    /// Path to the project manifest named by the arguments
    pub fn manifest_path(&self) -> PathBuf {
        if self.project.is_dir() {
            self.project.join(MANIFEST_FILE_NAME)
        } else {
            self.project.clone()
        }
    }

    /// Command line layer of the build options
    pub fn overrides(&self, tool: ToolInfo) -> OptionOverrides {
        OptionOverrides {
            defaults: BuildDefaults {
                configuration: self.configuration.clone(),
                runtime: self.runtime.clone(),
                output: self.output.clone(),
                build_base_path: self.build_base_path.clone(),
                compile_command: None,
            },
            framework: self.framework.clone(),
            version_suffix: self.version_suffix.clone(),
            native: NativeOptions {
                enabled: self.native,
                cpp: self.cpp,
                cpp_compiler_flags: self.cpp_compiler_flags.clone(),
                arch: self.arch.clone(),
                ilc_args: self.ilc_args.clone(),
                ilc_path: self.ilc_path.clone(),
                ilc_sdk_path: self.ilc_sdk_path.clone(),
            },
            skip_dependencies: self.no_dependencies,
            force_unsafe: self.no_incremental,
            print_preconditions: self.build_profile,
            tool: Some(tool),
        }
    }
}

/// Run the build command; `Ok(false)` means a compilation failed
pub fn run(args: BuildArgs) -> Result<bool> {
    let manifest_path = args.manifest_path();
    let manifest = ProjectManifest::load_from_file(&manifest_path)
        .with_context(|| format!("Failed to load {}", manifest_path.display()))?;

    let options = OptionsLoader::new()
        .load(Some(&manifest), &args.overrides(current_tool()))
        .context("Invalid build options")?;
    debug!("Build options: {:?}", options);

    let graph = load_graph(&manifest_path, &options)
        .with_context(|| format!("Failed to load the dependencies of {}", manifest.name()))?;

    let invoker = ProcessCompileInvoker::new(&options.tool.compile_command);
    let summary = BuildOrchestrator::new(&graph, &options, &invoker)
        .build()
        .context("Build failed")?;

    Ok(summary.success)
}

/// The tool is installed next to the running executable
fn current_tool() -> ToolInfo {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(ToolInfo::installed_at)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: BuildArgs,
    }

    fn parse(args: &[&str]) -> BuildArgs {
        TestCli::try_parse_from(std::iter::once("build").chain(args.iter().copied()))
            .unwrap()
            .args
    }

    #[test]
    fn test_defaults_to_current_directory() {
        let args = parse(&[]);
        assert_eq!(args.project, PathBuf::from("."));
        assert_eq!(args.manifest_path(), PathBuf::from("./kiln.toml"));
    }

    #[test]
    fn test_manifest_file_is_used_as_is() {
        let args = parse(&["src/App/app.toml"]);
        assert_eq!(args.manifest_path(), PathBuf::from("src/App/app.toml"));
    }

    #[test]
    fn test_short_flags_map_to_option_defaults() {
        let args = parse(&["-c", "Release", "-f", "net10.0", "-r", "linux-x64", "-o", "out", "-b", "base"]);
        let overrides = args.overrides(ToolInfo::default());

        assert_eq!(overrides.defaults.configuration.as_deref(), Some("Release"));
        assert_eq!(overrides.defaults.runtime.as_deref(), Some("linux-x64"));
        assert_eq!(overrides.defaults.output, Some(PathBuf::from("out")));
        assert_eq!(overrides.defaults.build_base_path, Some(PathBuf::from("base")));
        assert_eq!(overrides.framework.as_deref(), Some("net10.0"));
    }

    #[test]
    fn test_native_flags_are_collected() {
        let args = parse(&[
            "--native",
            "--cppcompilerflags",
            "-O2",
            "--ilcarg",
            "--verbose",
            "--ilcarg",
            "--stacktrace",
            "--ilcpath",
            "/opt/ilc",
        ]);
        let native = args.overrides(ToolInfo::default()).native;

        assert!(native.enabled);
        assert!(!native.cpp);
        assert_eq!(native.cpp_compiler_flags.as_deref(), Some("-O2"));
        assert_eq!(native.ilc_args, vec!["--verbose", "--stacktrace"]);
        assert_eq!(native.ilc_path, Some(PathBuf::from("/opt/ilc")));
    }

    #[test]
    fn test_incremental_switches() {
        let overrides = parse(&["--no-dependencies", "--no-incremental", "--build-profile"])
            .overrides(ToolInfo::default());
        assert!(overrides.skip_dependencies);
        assert!(overrides.force_unsafe);
        assert!(overrides.print_preconditions);
    }

    #[test]
    fn test_tool_is_passed_through() {
        let tool = ToolInfo::installed_at("/opt/kiln");
        let overrides = parse(&[]).overrides(tool.clone());
        assert_eq!(overrides.tool, Some(tool));
    }
}
