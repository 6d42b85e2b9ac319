/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to read manifest at {path}: {error}")]
    ManifestReadError { path: PathBuf, error: String },

    #[error("Project {project} does not have a lock file.")]
    MissingLockFile { project: String },

    #[error("Lock file error: {0}")]
    Lock(#[from] kiln_lock::LockError),

    #[error("Project '{project}' does not target framework '{framework}'")]
    FrameworkNotSupported { project: String, framework: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Project not found in dependency graph: {project}")]
    ProjectNotFound { project: String },

    #[error("Invalid glob pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    #[error("Failed to run compile command {command}: {error}")]
    CompilerInvocation {
        command: PathBuf,
        error: std::io::Error,
    },

    #[error("Build cache error: {0}")]
    CacheError(String),

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl BuildError {
    /// Create a manifest read error
    pub fn manifest_read(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::ManifestReadError {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a missing lock file error
    pub fn missing_lock_file(project: impl Into<String>) -> Self {
        Self::MissingLockFile {
            project: project.into(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, error: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            error: error.to_string(),
        }
    }

    /// Create a project not found error
    pub fn project_not_found(project: impl Into<String>) -> Self {
        Self::ProjectNotFound {
            project: project.into(),
        }
    }
}
