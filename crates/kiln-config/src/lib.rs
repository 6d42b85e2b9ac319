//! Kiln Configuration System
//!
//! Provides the configuration a build runs under:
//! - Project manifests (kiln.toml)
//! - Global user configuration (~/.kiln/config.toml)
//! - The immutable [`BuildOptions`] value handed to the build pipeline
//!
//! # Configuration Hierarchy
//!
//! Build options are resolved in the following order (later overrides earlier):
//! 1. Global config (~/.kiln/config.toml)
//! 2. Project manifest `[build]` table (./kiln.toml)
//! 3. Environment variables (KILN_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use kiln_config::{OptionsLoader, OptionOverrides, ProjectManifest};
//! use std::path::Path;
//!
//! let manifest = ProjectManifest::load_from_file(Path::new("kiln.toml")).unwrap();
//! let options = OptionsLoader::new()
//!     .load(Some(&manifest), &OptionOverrides::default())
//!     .unwrap();
//! ```

pub mod global;
pub mod loader;
pub mod manifest;
pub mod options;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use global::GlobalConfig;
pub use loader::{OptionOverrides, OptionsLoader};
pub use manifest::{
    BuildDefaults, CompileConfig, DependencySpec, ProjectManifest, ProjectSection,
    ScriptsConfig, MANIFEST_FILE_NAME,
};
pub use options::{BuildOptions, NativeOptions, ToolInfo, DEFAULT_CONFIGURATION};
