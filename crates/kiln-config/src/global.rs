//! Global Configuration (~/.kiln/config.toml)
//!
//! User-level build defaults shared by every project.

use crate::manifest::BuildDefaults;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.kiln/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Build option defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildDefaults>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(configuration) = self.build.as_ref().and_then(|b| b.configuration.as_ref()) {
            if configuration.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "build.configuration".to_string(),
                    reason: "configuration cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Path of the global configuration file (~/.kiln/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".kiln").join("config.toml"))
    }
}
