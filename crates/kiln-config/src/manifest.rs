//! Project Manifest (kiln.toml)
//!
//! The subset of a project description the build pipeline needs: identity,
//! target frameworks, compile inputs, hook scripts and project references.

use crate::{ConfigError, ConfigResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of a project manifest
pub const MANIFEST_FILE_NAME: &str = "kiln.toml";

/// Project manifest from kiln.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    /// Project metadata
    pub project: ProjectSection,

    /// Compilation inputs and compiler selection
    #[serde(default)]
    pub compile: CompileConfig,

    /// Hook scripts run by the compile step
    #[serde(default)]
    pub scripts: ScriptsConfig,

    /// Build option defaults for this project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildDefaults>,

    /// Dependencies, in declaration order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, DependencySpec>,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectSection {
    /// Project name, unique within a build
    pub name: String,

    /// Project version (semver)
    pub version: String,

    /// Target frameworks, first one is the default
    pub frameworks: Vec<String>,

    /// Whether the project produces a runnable application
    #[serde(default)]
    pub emit_entry_point: bool,

    /// Whether the compiler writes an XML documentation file
    #[serde(default)]
    pub xml_docs: bool,
}

/// Compilation inputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CompileConfig {
    /// Compiler name (default: "csc")
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Source globs, relative to the project directory
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Globs removed from the source set
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Resource globs
    #[serde(default = "default_resources")]
    pub resources: Vec<String>,

    /// Strong-name key file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
}

fn default_compiler() -> String {
    "csc".to_string()
}

fn default_include() -> Vec<String> {
    vec!["**/*.cs".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec!["bin/**".to_string(), "obj/**".to_string()]
}

fn default_resources() -> Vec<String> {
    vec!["**/*.resx".to_string()]
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            include: default_include(),
            exclude: default_exclude(),
            resources: default_resources(),
            key_file: None,
        }
    }
}

/// Hook scripts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ScriptsConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub precompile: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postcompile: Vec<String>,
}

/// Build option defaults, shared by the global config and project manifests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BuildDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_base_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_command: Option<PathBuf>,
}

impl BuildDefaults {
    /// Overlay `other` on top of `self`; set values in `other` win
    pub fn merge(&mut self, other: &BuildDefaults) {
        if other.configuration.is_some() {
            self.configuration = other.configuration.clone();
        }
        if other.runtime.is_some() {
            self.runtime = other.runtime.clone();
        }
        if other.output.is_some() {
            self.output = other.output.clone();
        }
        if other.build_base_path.is_some() {
            self.build_base_path = other.build_base_path.clone();
        }
        if other.compile_command.is_some() {
            self.compile_command = other.compile_command.clone();
        }
    }
}

/// Dependency specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Simple version string (e.g., "1.0")
    Version(String),

    /// Detailed dependency spec
    Detailed {
        /// Version requirement
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,

        /// Project directory, for project references
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
}

impl ProjectManifest {
    /// Load a manifest from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let manifest: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> ConfigResult<()> {
        if self.project.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "project.name".to_string(),
                reason: "name cannot be empty".to_string(),
            });
        }

        if !is_valid_version(&self.project.version) {
            return Err(ConfigError::InvalidVersion(self.project.version.clone()));
        }

        if self.project.frameworks.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "project.frameworks".to_string(),
                reason: "at least one framework is required".to_string(),
            });
        }

        if self.compile.compiler.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "compile.compiler".to_string(),
                reason: "compiler cannot be empty".to_string(),
            });
        }

        for (name, spec) in &self.dependencies {
            validate_dependency(name, spec)?;
        }

        Ok(())
    }

    /// Project name
    pub fn name(&self) -> &str {
        &self.project.name
    }

    /// First declared framework
    pub fn default_framework(&self) -> &str {
        &self.project.frameworks[0]
    }

    /// Whether `framework` is one the project targets
    pub fn targets_framework(&self, framework: &str) -> bool {
        self.project.frameworks.iter().any(|f| f == framework)
    }
}

/// Basic semver validation (simplified)
fn is_valid_version(version: &str) -> bool {
    let main_version = version.split(['-', '+']).next().unwrap_or("");
    if main_version.is_empty() {
        return false;
    }

    let parts: Vec<&str> = main_version.split('.').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return false;
    }

    parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

fn validate_dependency(name: &str, spec: &DependencySpec) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "dependency name".to_string(),
            reason: "name cannot be empty".to_string(),
        });
    }

    match spec {
        DependencySpec::Version(v) if v.is_empty() => Err(ConfigError::InvalidValue {
            field: format!("dependency '{}'", name),
            reason: "version cannot be empty".to_string(),
        }),
        DependencySpec::Detailed {
            version: None,
            path: None,
        } => Err(ConfigError::InvalidValue {
            field: format!("dependency '{}'", name),
            reason: "must specify version or path".to_string(),
        }),
        _ => Ok(()),
    }
}
