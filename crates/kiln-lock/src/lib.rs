//! Kiln lock files
//!
//! A lock file (`kiln.lock`) is the pinned dependency graph a restore step
//! produces for a project. The build consumes it read-only: it locates
//! project-to-project edges through it and treats any change to it as a
//! change to every non-project dependency.
//!
//! Restores that run independently per target or runtime write fragments;
//! [`merge`] folds those back into a single master graph.

pub mod lockfile;
pub mod merge;

pub use lockfile::{
    LibraryKind, LockFile, LockLibrary, LockTarget, ProjectReference, TargetLibrary,
    EXPORT_FILE_NAME, LOCK_FILE_NAME,
};
pub use merge::{merge, MergeError};

use std::path::PathBuf;

/// Lock file errors
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Failed to read lock file {path}: {error}")]
    Read {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Failed to parse lock file {path}: {error}")]
    Parse {
        path: PathBuf,
        error: toml::de::Error,
    },

    #[error("Failed to serialize lock file: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write lock file {path}: {error}")]
    Write {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid lock file: {0}")]
    Invalid(String),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

pub type Result<T> = std::result::Result<T, LockError>;
