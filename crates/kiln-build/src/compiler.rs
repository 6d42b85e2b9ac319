//! External compiler invocation
//!
//! The build never compiles anything itself; it hands an argument list to a
//! [`CompileInvoker`] and only looks at the exit code.

use crate::project::ProjectNode;
use kiln_config::BuildOptions;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Runs one compilation and reports its exit code; zero means success
pub trait CompileInvoker: fmt::Debug {
    fn invoke(&self, args: &[String]) -> io::Result<i32>;

    /// Command reported in errors
    fn command(&self) -> &Path;
}

/// Runs the configured compile command as a child process with inherited stdio
#[derive(Debug, Clone)]
pub struct ProcessCompileInvoker {
    command: PathBuf,
}

impl ProcessCompileInvoker {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl CompileInvoker for ProcessCompileInvoker {
    fn invoke(&self, args: &[String]) -> io::Result<i32> {
        debug!("Running {} {}", self.command.display(), args.join(" "));
        let status = Command::new(&self.command).args(args).status()?;
        // Terminated by a signal
        Ok(status.code().unwrap_or(-1))
    }

    fn command(&self) -> &Path {
        &self.command
    }
}

/// Arguments for compiling a dependency with its own framework
pub fn dependency_args(project: &ProjectNode, options: &BuildOptions) -> Vec<String> {
    let mut args = vec![
        "--framework".to_string(),
        project.framework().to_string(),
        "--configuration".to_string(),
        options.configuration.clone(),
        project.dir().display().to_string(),
    ];

    push_option(&mut args, "--runtime", options.runtime.as_deref());
    push_option(&mut args, "--version-suffix", options.version_suffix.as_deref());
    push_path(&mut args, "--build-base-path", options.build_base_path.as_deref());
    args
}

/// Arguments for compiling the root project with every forwarded option
pub fn root_args(project: &ProjectNode, options: &BuildOptions) -> Vec<String> {
    let mut args = vec![
        "--framework".to_string(),
        project.framework().to_string(),
        "--configuration".to_string(),
        options.configuration.clone(),
    ];

    push_option(&mut args, "--runtime", options.runtime.as_deref());
    push_path(&mut args, "--output", options.output.as_deref());
    push_option(&mut args, "--version-suffix", options.version_suffix.as_deref());
    push_path(&mut args, "--build-base-path", options.build_base_path.as_deref());

    let native = &options.native;
    if native.enabled {
        args.push("--native".to_string());
    }
    if native.cpp {
        args.push("--cpp".to_string());
    }
    push_option(&mut args, "--cppcompilerflags", native.cpp_compiler_flags.as_deref());
    push_option(&mut args, "--arch", native.arch.as_deref());
    for ilc_arg in &native.ilc_args {
        args.push("--ilcarg".to_string());
        args.push(ilc_arg.clone());
    }
    push_path(&mut args, "--ilcpath", native.ilc_path.as_deref());
    push_path(&mut args, "--ilcsdkpath", native.ilc_sdk_path.as_deref());

    args.push(project.dir().display().to_string());
    args
}

fn push_option(args: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

fn push_path(args: &mut Vec<String>, flag: &str, value: Option<&Path>) {
    if let Some(value) = value.filter(|v| !v.as_os_str().is_empty()) {
        args.push(flag.to_string());
        args.push(value.display().to_string());
    }
}
