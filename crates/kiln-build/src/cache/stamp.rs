//! Tool version stamps
//!
//! A project built by one version (or architecture) of the tool must be
//! rebuilt when another one picks it up. The current descriptor is the
//! content of the tool's version file followed by the host architecture;
//! it is copied into each project's intermediate directory after a build.

use crate::error::{BuildError, BuildResult};
use kiln_config::ToolInfo;
use std::fs;
use std::path::Path;

/// Version descriptor of the running tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion(String);

impl ToolVersion {
    /// Descriptor of `tool`, `None` when it has no readable version file
    pub fn current(tool: &ToolInfo) -> Option<Self> {
        let version_file = tool.version_file.as_deref()?;
        let content = fs::read_to_string(version_file).ok()?;
        Some(Self::from_version_text(&content))
    }

    /// Descriptor for a version file's content on this host
    pub fn from_version_text(content: &str) -> Self {
        let mut descriptor = content.trim_end().to_string();
        descriptor.push('\n');
        descriptor.push_str(std::env::consts::ARCH);
        Self(descriptor)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a stamp's content
    pub fn matches(&self, stamp: &str) -> bool {
        self.0.trim().eq_ignore_ascii_case(stamp.trim())
    }
}

/// Content of a stamp file; missing or unreadable stamps read as `None`
pub fn read_stamp(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// Write `version` into the stamp file at `path`
pub fn write_stamp(path: &Path, version: &ToolVersion) -> BuildResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    fs::write(path, version.as_str()).map_err(|e| BuildError::io(path, e))
}
