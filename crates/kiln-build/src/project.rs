//! Projects taking part in a build
//!
//! A [`ProjectNode`] is one project evaluated for one framework and runtime.
//! It is created once per invocation and never changes afterwards.

use crate::error::{BuildError, BuildResult};
use globset::{Glob, GlobSet, GlobSetBuilder};
use kiln_config::ProjectManifest;
use kiln_lock::{LockFile, LOCK_FILE_NAME};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Compilers whose behaviour is understood well enough to trust a skipped build
pub const KNOWN_COMPILERS: [&str; 3] = ["csc", "vbc", "fsc"];

/// A project evaluated for one (framework, runtime) combination
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    name: String,
    version: String,
    dir: PathBuf,
    manifest_path: PathBuf,
    framework: String,
    runtime: Option<String>,
    descriptor: Option<ProjectManifest>,
    lock_file: Option<ProjectLockFile>,
}

/// A project's lock file, as located beside its manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectLockFile {
    /// Path of kiln.lock
    pub path: PathBuf,
    /// Path of the companion export file, when one exists
    pub export_path: Option<PathBuf>,
    /// Lock graph with the export file already folded in
    pub lock: LockFile,
}

impl ProjectNode {
    /// Load a project from its manifest
    ///
    /// `framework` defaults to the first framework the project declares.
    pub fn load(
        manifest_path: &Path,
        framework: Option<&str>,
        runtime: Option<&str>,
    ) -> BuildResult<Self> {
        let descriptor = ProjectManifest::load_from_file(manifest_path)
            .map_err(|e| BuildError::manifest_read(manifest_path, e))?;

        let framework = match framework {
            Some(framework) if !descriptor.targets_framework(framework) => {
                return Err(BuildError::FrameworkNotSupported {
                    project: descriptor.name().to_string(),
                    framework: framework.to_string(),
                });
            }
            Some(framework) => framework.to_string(),
            None => descriptor.default_framework().to_string(),
        };

        let dir = project_dir(manifest_path);
        let lock_file = locate_lock_file(&dir)?;

        Ok(Self {
            name: descriptor.name().to_string(),
            version: descriptor.project.version.clone(),
            dir,
            manifest_path: manifest_path.to_path_buf(),
            framework,
            runtime: runtime.map(str::to_string),
            descriptor: Some(descriptor),
            lock_file,
        })
    }

    /// A referenced project whose manifest is not available
    pub fn without_sources(
        name: impl Into<String>,
        version: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
        framework: impl Into<String>,
        runtime: Option<String>,
    ) -> Self {
        let manifest_path = manifest_path.into();
        Self {
            name: name.into(),
            version: version.into(),
            dir: project_dir(&manifest_path),
            manifest_path,
            framework: framework.into(),
            runtime,
            descriptor: None,
            lock_file: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Project directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn framework(&self) -> &str {
        &self.framework
    }

    pub fn runtime(&self) -> Option<&str> {
        self.runtime.as_deref()
    }

    /// Parsed manifest, absent for projects without sources
    pub fn descriptor(&self) -> Option<&ProjectManifest> {
        self.descriptor.as_ref()
    }

    pub fn lock_file(&self) -> Option<&ProjectLockFile> {
        self.lock_file.as_ref()
    }

    /// Whether the project can be compiled from source by this build
    pub fn has_sources(&self) -> bool {
        self.descriptor.is_some()
    }

    /// Compiler name declared by the manifest
    pub fn compiler(&self) -> Option<&str> {
        self.descriptor.as_ref().map(|d| d.compile.compiler.as_str())
    }

    /// Whether the project produces a runnable application
    pub fn emits_entry_point(&self) -> bool {
        self.descriptor
            .as_ref()
            .is_some_and(|d| d.project.emit_entry_point)
    }

    /// Whether the compiler writes an XML documentation file
    pub fn xml_docs(&self) -> bool {
        self.descriptor.as_ref().is_some_and(|d| d.project.xml_docs)
    }

    /// Name used in build messages: `name (framework)` or `name (framework/runtime)`
    pub fn display_name(&self) -> String {
        match &self.runtime {
            Some(runtime) => format!("{} ({}/{})", self.name, self.framework, runtime),
            None => format!("{} ({})", self.name, self.framework),
        }
    }

    /// Hook scripts run before compilation
    pub fn precompile_scripts(&self) -> &[String] {
        self.descriptor
            .as_ref()
            .map(|d| d.scripts.precompile.as_slice())
            .unwrap_or(&[])
    }

    /// Hook scripts run after compilation
    pub fn postcompile_scripts(&self) -> &[String] {
        self.descriptor
            .as_ref()
            .map(|d| d.scripts.postcompile.as_slice())
            .unwrap_or(&[])
    }

    /// Strong-name key file, resolved against the project directory
    pub fn key_file(&self) -> Option<PathBuf> {
        self.descriptor
            .as_ref()
            .and_then(|d| d.compile.key_file.as_ref())
            .map(|key| self.dir.join(key))
    }

    /// Source files matched by the compile include/exclude globs, sorted
    pub fn source_files(&self) -> BuildResult<Vec<PathBuf>> {
        match &self.descriptor {
            Some(d) => self.matching_files(&d.compile.include, &d.compile.exclude),
            None => Ok(Vec::new()),
        }
    }

    /// Resource files matched by the resource globs, sorted
    pub fn resource_files(&self) -> BuildResult<Vec<PathBuf>> {
        match &self.descriptor {
            Some(d) => self.matching_files(&d.compile.resources, &d.compile.exclude),
            None => Ok(Vec::new()),
        }
    }

    fn matching_files(&self, include: &[String], exclude: &[String]) -> BuildResult<Vec<PathBuf>> {
        let include = build_globset(include)?;
        let exclude = build_globset(exclude)?;

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.dir) else {
                continue;
            };
            if include.is_match(relative) && !exclude.is_match(relative) {
                files.push(entry.path().to_path_buf());
            }
        }
        Ok(files)
    }
}

fn build_globset(patterns: &[String]) -> BuildResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| BuildError::invalid_pattern(pattern, e))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BuildError::invalid_pattern(patterns.join(", "), e))
}

fn project_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn locate_lock_file(dir: &Path) -> BuildResult<Option<ProjectLockFile>> {
    let path = dir.join(LOCK_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }

    let export_path = LockFile::export_path_for(&path);
    let lock = LockFile::load(&path)?;
    Ok(Some(ProjectLockFile {
        export_path: export_path.is_file().then_some(export_path),
        path,
        lock,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(dir: &Path, extra: &str) -> PathBuf {
        let manifest = format!(
            r#"
[project]
name = "App"
version = "1.0.0"
frameworks = ["net10.0", "net9.0"]
{}
"#,
            extra
        );
        let path = dir.join("kiln.toml");
        fs::write(&path, manifest).unwrap();
        path
    }

    #[test]
    fn test_load_defaults_to_first_framework() {
        let dir = TempDir::new().unwrap();
        let manifest = write_project(dir.path(), "");

        let project = ProjectNode::load(&manifest, None, None).unwrap();
        assert_eq!(project.name(), "App");
        assert_eq!(project.framework(), "net10.0");
        assert_eq!(project.dir(), dir.path());
        assert!(project.has_sources());
        assert!(project.lock_file().is_none());
    }

    #[test]
    fn test_load_rejects_untargeted_framework() {
        let dir = TempDir::new().unwrap();
        let manifest = write_project(dir.path(), "");

        match ProjectNode::load(&manifest, Some("net8.0"), None) {
            Err(BuildError::FrameworkNotSupported { framework, .. }) => {
                assert_eq!(framework, "net8.0")
            }
            other => panic!("Expected FrameworkNotSupported, got {:?}", other),
        }
    }

    #[test]
    fn test_load_finds_lock_and_export_files() {
        let dir = TempDir::new().unwrap();
        let manifest = write_project(dir.path(), "");
        LockFile::new()
            .write_to_file(&dir.path().join(LOCK_FILE_NAME))
            .unwrap();
        LockFile::new()
            .write_to_file(&dir.path().join(kiln_lock::EXPORT_FILE_NAME))
            .unwrap();

        let project = ProjectNode::load(&manifest, None, Some("linux-x64")).unwrap();
        let lock = project.lock_file().unwrap();
        assert_eq!(lock.path, dir.path().join(LOCK_FILE_NAME));
        assert_eq!(
            lock.export_path,
            Some(dir.path().join(kiln_lock::EXPORT_FILE_NAME))
        );
        assert_eq!(project.display_name(), "App (net10.0/linux-x64)");
    }

    #[test]
    fn test_source_files_respect_globs() {
        let dir = TempDir::new().unwrap();
        let manifest = write_project(dir.path(), "");
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("obj/Debug")).unwrap();
        fs::write(dir.path().join("Program.cs"), "").unwrap();
        fs::write(dir.path().join("src/Util.cs"), "").unwrap();
        fs::write(dir.path().join("obj/Debug/Generated.cs"), "").unwrap();
        fs::write(dir.path().join("README.md"), "").unwrap();

        let project = ProjectNode::load(&manifest, None, None).unwrap();
        let sources = project.source_files().unwrap();
        assert_eq!(
            sources,
            vec![dir.path().join("Program.cs"), dir.path().join("src/Util.cs")]
        );
    }

    #[test]
    fn test_invalid_glob_is_reported() {
        let dir = TempDir::new().unwrap();
        let manifest = write_project(dir.path(), "[compile]\ninclude = [\"src/[\"]");

        let project = ProjectNode::load(&manifest, None, None).unwrap();
        assert!(matches!(
            project.source_files(),
            Err(BuildError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_project_without_sources() {
        let project = ProjectNode::without_sources(
            "Prebuilt",
            "2.0.0",
            "/libs/Prebuilt/kiln.toml",
            "net10.0",
            None,
        );
        assert!(!project.has_sources());
        assert_eq!(project.compiler(), None);
        assert!(project.source_files().unwrap().is_empty());
        assert!(project.precompile_scripts().is_empty());
    }
}
