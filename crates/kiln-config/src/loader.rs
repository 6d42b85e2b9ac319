//! Build options loader
//!
//! Resolves [`BuildOptions`] from every configuration source with proper precedence:
//! 1. Global config (~/.kiln/config.toml) - lowest priority
//! 2. Project manifest `[build]` table - overrides global
//! 3. Environment variables (KILN_*) - overrides project
//! 4. CLI flags - highest priority

use crate::global::GlobalConfig;
use crate::manifest::{BuildDefaults, ProjectManifest};
use crate::options::{BuildOptions, NativeOptions, ToolInfo, DEFAULT_CONFIGURATION};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Settings that only the command line provides
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    /// Values that may also come from config files or the environment
    pub defaults: BuildDefaults,
    pub framework: Option<String>,
    pub version_suffix: Option<String>,
    pub native: NativeOptions,
    pub skip_dependencies: bool,
    pub force_unsafe: bool,
    pub print_preconditions: bool,
    /// The running tool; `ToolInfo::default()` when unset
    pub tool: Option<ToolInfo>,
}

/// Build options loader
pub struct OptionsLoader {
    /// Global config path override
    global_config_path: Option<PathBuf>,
}

impl OptionsLoader {
    /// Create a loader that reads the global config from the home directory
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Read the global config from `path` instead of the home directory
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Resolve build options for a project
    pub fn load(
        &self,
        manifest: Option<&ProjectManifest>,
        overrides: &OptionOverrides,
    ) -> ConfigResult<BuildOptions> {
        let global = match self.load_global_config() {
            Ok(global) => global,
            Err(e) => {
                warn!("Ignoring global config: {}", e);
                GlobalConfig::default()
            }
        };
        let mut defaults = global.build.unwrap_or_default();

        if let Some(project_defaults) = manifest.and_then(|m| m.build.as_ref()) {
            defaults.merge(project_defaults);
        }
        defaults.merge(&env_defaults());
        defaults.merge(&overrides.defaults);

        if let (Some(manifest), Some(framework)) = (manifest, overrides.framework.as_deref()) {
            if !manifest.targets_framework(framework) {
                return Err(ConfigError::InvalidValue {
                    field: "framework".to_string(),
                    reason: format!(
                        "project '{}' does not target framework '{}'",
                        manifest.name(),
                        framework
                    ),
                });
            }
        }

        let mut tool = overrides.tool.clone().unwrap_or_default();
        if let Some(command) = defaults.compile_command {
            tool.compile_command = command;
        }

        Ok(BuildOptions {
            configuration: defaults
                .configuration
                .unwrap_or_else(|| DEFAULT_CONFIGURATION.to_string()),
            framework: overrides.framework.clone(),
            runtime: defaults.runtime,
            output: defaults.output,
            build_base_path: defaults.build_base_path,
            version_suffix: overrides.version_suffix.clone(),
            native: overrides.native.clone(),
            skip_dependencies: overrides.skip_dependencies,
            force_unsafe: overrides.force_unsafe || env_flag("KILN_NO_INCREMENTAL"),
            print_preconditions: overrides.print_preconditions,
            tool,
        })
    }

    fn load_global_config(&self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => GlobalConfig::global_config_path()?,
        };

        // Global config is optional
        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }
}

impl Default for OptionsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment variable overrides: KILN_CONFIGURATION, KILN_RUNTIME, KILN_OUTPUT,
/// KILN_BUILD_BASE_PATH, KILN_COMPILE_COMMAND
fn env_defaults() -> BuildDefaults {
    BuildDefaults {
        configuration: env_value("KILN_CONFIGURATION"),
        runtime: env_value("KILN_RUNTIME"),
        output: env_value("KILN_OUTPUT").map(PathBuf::from),
        build_base_path: env_value("KILN_BUILD_BASE_PATH").map(PathBuf::from),
        compile_command: env_value("KILN_COMPILE_COMMAND").map(PathBuf::from),
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(name: &str) -> bool {
    env_value(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn manifest_with_build(build: &str) -> ProjectManifest {
        let content = format!(
            r#"
[project]
name = "App"
version = "1.0.0"
frameworks = ["net10.0", "net9.0"]

{}
"#,
            build
        );
        toml::from_str(&content).unwrap()
    }

    fn loader_without_global(dir: &TempDir) -> OptionsLoader {
        OptionsLoader::new().with_global_config_path(dir.path().join("missing.toml"))
    }

    #[test]
    #[serial]
    fn test_defaults_without_any_source() {
        let dir = TempDir::new().unwrap();
        let options = loader_without_global(&dir)
            .load(None, &OptionOverrides::default())
            .unwrap();

        assert_eq!(options, BuildOptions::default());
    }

    #[test]
    #[serial]
    fn test_manifest_overrides_global() {
        let dir = TempDir::new().unwrap();
        let global_path = dir.path().join("config.toml");
        fs::write(
            &global_path,
            "[build]\nconfiguration = \"Release\"\nruntime = \"linux-x64\"\n",
        )
        .unwrap();

        let manifest = manifest_with_build("[build]\nconfiguration = \"Staging\"");
        let options = OptionsLoader::new()
            .with_global_config_path(&global_path)
            .load(Some(&manifest), &OptionOverrides::default())
            .unwrap();

        assert_eq!(options.configuration, "Staging");
        assert_eq!(options.runtime.as_deref(), Some("linux-x64"));
    }

    #[test]
    #[serial]
    fn test_malformed_global_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let global_path = dir.path().join("config.toml");
        fs::write(&global_path, "[build\nconfiguration = ").unwrap();

        let manifest = manifest_with_build("[build]\nruntime = \"linux-x64\"");
        let options = OptionsLoader::new()
            .with_global_config_path(&global_path)
            .load(Some(&manifest), &OptionOverrides::default())
            .unwrap();

        assert_eq!(options.configuration, DEFAULT_CONFIGURATION);
        assert_eq!(options.runtime.as_deref(), Some("linux-x64"));
    }

    #[test]
    #[serial]
    fn test_env_override_configuration() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_with_build("[build]\nconfiguration = \"Staging\"");

        env::set_var("KILN_CONFIGURATION", "Release");
        let options = loader_without_global(&dir)
            .load(Some(&manifest), &OptionOverrides::default())
            .unwrap();
        env::remove_var("KILN_CONFIGURATION");

        assert_eq!(options.configuration, "Release");
    }

    #[test]
    #[serial]
    fn test_cli_overrides_env() {
        let dir = TempDir::new().unwrap();
        let overrides = OptionOverrides {
            defaults: BuildDefaults {
                configuration: Some("Debug".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        env::set_var("KILN_CONFIGURATION", "Release");
        let options = loader_without_global(&dir).load(None, &overrides).unwrap();
        env::remove_var("KILN_CONFIGURATION");

        assert_eq!(options.configuration, "Debug");
    }

    #[test]
    #[serial]
    fn test_no_incremental_env_forces_unsafe() {
        let dir = TempDir::new().unwrap();

        env::set_var("KILN_NO_INCREMENTAL", "1");
        let options = loader_without_global(&dir)
            .load(None, &OptionOverrides::default())
            .unwrap();
        env::remove_var("KILN_NO_INCREMENTAL");

        assert!(options.force_unsafe);
    }

    #[test]
    #[serial]
    fn test_compile_command_override_replaces_tool_command() {
        let dir = TempDir::new().unwrap();
        let overrides = OptionOverrides {
            tool: Some(ToolInfo::installed_at("/opt/kiln")),
            defaults: BuildDefaults {
                compile_command: Some(PathBuf::from("/usr/bin/fake-compile")),
                ..Default::default()
            },
            ..Default::default()
        };

        let options = loader_without_global(&dir).load(None, &overrides).unwrap();
        assert_eq!(
            options.tool.compile_command,
            PathBuf::from("/usr/bin/fake-compile")
        );
        assert_eq!(options.tool.install_dir, Some(PathBuf::from("/opt/kiln")));
    }

    #[test]
    #[serial]
    fn test_unknown_framework_rejected() {
        let dir = TempDir::new().unwrap();
        let manifest = manifest_with_build("");
        let overrides = OptionOverrides {
            framework: Some("net8.0".to_string()),
            ..Default::default()
        };

        match loader_without_global(&dir).load(Some(&manifest), &overrides) {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "framework"),
            other => panic!("Expected InvalidValue error, got {:?}", other),
        }
    }
}
