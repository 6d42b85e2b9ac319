//! Lock file model (kiln.lock)

use crate::{LockError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// File name of a project's lock file, next to its manifest
pub const LOCK_FILE_NAME: &str = "kiln.lock";

/// File name of the companion export file a restore may leave beside the lock file
pub const EXPORT_FILE_NAME: &str = "kiln.fragment.lock";

/// Lock file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockFile {
    /// Lock file format version
    pub version: u32,
    /// Every library the restore pinned, keyed by (name, version)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LockLibrary>,
    /// Per (framework, runtime) views of the graph
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<LockTarget>,
    /// Project references, keyed by manifest path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<ProjectReference>,
}

impl LockFile {
    /// Current lock file format version
    pub const VERSION: u32 = 1;

    /// Create new empty lock file
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            libraries: Vec::new(),
            targets: Vec::new(),
            projects: Vec::new(),
        }
    }

    /// Parse lock file from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load a single lock file from disk, without folding in any companion file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|error| LockError::Read {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_str(&content).map_err(|error| LockError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Serialize to TOML string
    pub fn to_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Write lock file to disk
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = self.to_string()?;
        std::fs::write(path, content).map_err(|error| LockError::Write {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Path of the companion export file for a lock file at `lock_path`
    pub fn export_path_for(lock_path: &Path) -> PathBuf {
        lock_path.with_file_name(EXPORT_FILE_NAME)
    }

    /// Add a library record, replacing any record with the same identity
    pub fn add_library(&mut self, library: LockLibrary) {
        self.libraries
            .retain(|l| !(l.name == library.name && l.version == library.version));
        self.libraries.push(library);
        self.libraries
            .sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    }

    /// Get a library record by identity
    pub fn library(&self, name: &str, version: &semver::Version) -> Option<&LockLibrary> {
        self.libraries
            .iter()
            .find(|l| l.name == name && &l.version == version)
    }

    /// Get the target for a framework and optional runtime
    pub fn target(&self, framework: &str, runtime: Option<&str>) -> Option<&LockTarget> {
        self.targets
            .iter()
            .find(|t| t.framework == framework && t.runtime.as_deref() == runtime)
    }

    /// Find a project reference by project name
    pub fn project_by_name(&self, name: &str) -> Option<&ProjectReference> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Verify lock file integrity
    pub fn verify(&self) -> Result<()> {
        if self.version > Self::VERSION {
            return Err(LockError::Invalid(format!(
                "lock file version {} is newer than supported version {}",
                self.version,
                Self::VERSION
            )));
        }

        let mut seen = HashSet::new();
        for library in &self.libraries {
            if !seen.insert((&library.name, &library.version)) {
                return Err(LockError::Invalid(format!(
                    "duplicate library {}/{}",
                    library.name, library.version
                )));
            }
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert((&target.framework, &target.runtime)) {
                return Err(LockError::Invalid(format!(
                    "duplicate target {}",
                    target.display_name()
                )));
            }
        }

        let mut seen = HashSet::new();
        for project in &self.projects {
            if !seen.insert(&project.path) {
                return Err(LockError::Invalid(format!(
                    "duplicate project reference {}",
                    project.path.display()
                )));
            }
        }

        Ok(())
    }
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a library is another buildable project or a prebuilt package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Project,
    Package,
}

/// Library record, unique by (name, version)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockLibrary {
    pub name: String,
    pub version: semver::Version,
    pub kind: LibraryKind,
    /// Package hash, as reported by the feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

/// The libraries visible to one (framework, runtime) combination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockTarget {
    pub framework: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default)]
    pub libraries: Vec<TargetLibrary>,
}

impl LockTarget {
    /// Create an empty target
    pub fn new(framework: impl Into<String>, runtime: Option<String>) -> Self {
        Self {
            framework: framework.into(),
            runtime,
            libraries: Vec::new(),
        }
    }

    /// Add a library to this target
    pub fn with_library(mut self, library: TargetLibrary) -> Self {
        self.libraries.push(library);
        self
    }

    /// Find a library in this target by name
    pub fn library(&self, name: &str) -> Option<&TargetLibrary> {
        self.libraries.iter().find(|l| l.name == name)
    }

    /// `framework` or `framework/runtime`
    pub fn display_name(&self) -> String {
        match &self.runtime {
            Some(runtime) => format!("{}/{}", self.framework, runtime),
            None => self.framework.clone(),
        }
    }
}

/// A library as resolved for a specific target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetLibrary {
    pub name: String,
    pub version: semver::Version,
    pub kind: LibraryKind,
    /// Framework a project-type library was resolved against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    /// Names of the libraries this one depends on, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compile: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runtime: Vec<String>,
}

impl TargetLibrary {
    /// Create a package-type target library
    pub fn package(name: impl Into<String>, version: semver::Version) -> Self {
        Self {
            name: name.into(),
            version,
            kind: LibraryKind::Package,
            framework: None,
            dependencies: Vec::new(),
            compile: Vec::new(),
            runtime: Vec::new(),
        }
    }

    /// Create a project-type target library
    pub fn project(
        name: impl Into<String>,
        version: semver::Version,
        framework: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            kind: LibraryKind::Project,
            framework: Some(framework.into()),
            dependencies: Vec::new(),
            compile: Vec::new(),
            runtime: Vec::new(),
        }
    }

    /// Set dependency names
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }
}

/// Where a project-type library's manifest lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectReference {
    /// Manifest path, relative to the lock file's directory
    pub path: PathBuf,
    pub name: String,
}
