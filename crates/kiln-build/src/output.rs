//! Output layout of a project build
//!
//! ```text
//! <base>/obj/<configuration>/<framework>[/<runtime>]   intermediate files, stamp, cache
//! <base>/bin/<configuration>/<framework>               compilation output
//! <compilation output>[/<runtime>]                     runtime output
//! ```
//!
//! `<base>` is the project directory, or `<build base path>/<project name>`
//! when a build base path is configured. An explicit output directory only
//! ever applies to the root project.

use crate::project::ProjectNode;
use kiln_config::BuildOptions;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// File name of the tool version stamp inside the intermediate directory
pub const STAMP_FILE_NAME: &str = ".toolversion";

/// Resolved output directories and file names for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    name: String,
    xml_docs: bool,
    intermediate: PathBuf,
    compilation_output: PathBuf,
    runtime_output: PathBuf,
    cache_key: String,
}

impl OutputPaths {
    /// Compute the layout for `project` under `options`
    pub fn for_project(project: &ProjectNode, options: &BuildOptions, is_root: bool) -> Self {
        let base = match &options.build_base_path {
            Some(base_path) => base_path.join(project.name()),
            None => project.dir().to_path_buf(),
        };

        let mut intermediate = base
            .join("obj")
            .join(&options.configuration)
            .join(project.framework());
        if let Some(runtime) = project.runtime() {
            intermediate.push(runtime);
        }

        let explicit_output = if is_root { options.output.as_ref() } else { None };
        let compilation_output = match explicit_output {
            Some(output) => output.clone(),
            None => base
                .join("bin")
                .join(&options.configuration)
                .join(project.framework()),
        };

        let runtime_output = match (project.runtime(), explicit_output) {
            (Some(runtime), None) => compilation_output.join(runtime),
            _ => compilation_output.clone(),
        };

        Self {
            name: project.name().to_string(),
            xml_docs: project.xml_docs(),
            intermediate,
            compilation_output,
            runtime_output,
            cache_key: cache_key(options, explicit_output),
        }
    }

    pub fn intermediate(&self) -> &Path {
        &self.intermediate
    }

    pub fn compilation_output(&self) -> &Path {
        &self.compilation_output
    }

    pub fn runtime_output(&self) -> &Path {
        &self.runtime_output
    }

    /// Files the compiler writes into the compilation output
    pub fn compilation_files(&self) -> Vec<PathBuf> {
        self.assembly_files(&self.compilation_output)
    }

    /// Files making up a runnable application in the runtime output
    pub fn runtime_files(&self) -> Vec<PathBuf> {
        let mut files = self.assembly_files(&self.runtime_output);
        files.push(self.deps_file());
        files.push(self.runtime_config_file());
        files
    }

    /// `<name>.deps.json` in the runtime output
    pub fn deps_file(&self) -> PathBuf {
        self.runtime_output.join(format!("{}.deps.json", self.name))
    }

    /// `<name>.runtimeconfig.json` in the runtime output
    pub fn runtime_config_file(&self) -> PathBuf {
        self.runtime_output
            .join(format!("{}.runtimeconfig.json", self.name))
    }

    /// Tool version stamp written after every build of the project
    pub fn stamp_file(&self) -> PathBuf {
        self.intermediate.join(STAMP_FILE_NAME)
    }

    /// Incremental cache for this configuration/output combination
    pub fn cache_file(&self) -> PathBuf {
        self.intermediate
            .join(format!(".incremental-{}.json", self.cache_key))
    }

    /// Compiled output of a non-culture resource
    pub fn resource_output(&self, resource: &Path) -> PathBuf {
        let stem = resource
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.intermediate
            .join(format!("{}.{}.resources", self.name, stem))
    }

    /// Satellite assembly for one culture
    pub fn satellite_assembly(&self, culture: &str) -> PathBuf {
        self.compilation_output
            .join(culture)
            .join(format!("{}.resources.dll", self.name))
    }

    fn assembly_files(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files = vec![
            dir.join(format!("{}.dll", self.name)),
            dir.join(format!("{}.pdb", self.name)),
        ];
        if self.xml_docs {
            files.push(dir.join(format!("{}.xml", self.name)));
        }
        files
    }
}

/// Culture of a resource file named `<name>.<culture>.resx`, if any
pub fn resource_culture(resource: &Path) -> Option<String> {
    let stem = resource.file_stem()?.to_str()?;
    let (_, candidate) = stem.rsplit_once('.')?;
    is_culture_name(candidate).then(|| candidate.to_string())
}

/// `ll` or `lll`, optionally followed by `-Xxxx` style subtags
fn is_culture_name(name: &str) -> bool {
    let mut parts = name.split('-');
    let language_ok = parts.next().is_some_and(|language| {
        (2..=3).contains(&language.len()) && language.chars().all(|c| c.is_ascii_lowercase())
    });
    language_ok
        && parts.all(|subtag| {
            (2..=8).contains(&subtag.len()) && subtag.chars().all(|c| c.is_ascii_alphanumeric())
        })
}

fn cache_key(options: &BuildOptions, output: Option<&PathBuf>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(options.configuration.as_bytes());
    hasher.update([0]);
    if let Some(base) = &options.build_base_path {
        hasher.update(base.to_string_lossy().as_bytes());
    }
    hasher.update([0]);
    if let Some(output) = output {
        hasher.update(output.to_string_lossy().as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}
