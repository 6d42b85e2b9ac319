//! Incremental cache file

use crate::error::{BuildError, BuildResult};
use crate::io::CompilerIO;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Snapshot of the inputs and outputs seen by the previous evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementalCache {
    #[serde(flatten)]
    pub compiler_io: CompilerIO,
}

impl IncrementalCache {
    pub fn new(compiler_io: CompilerIO) -> Self {
        Self { compiler_io }
    }

    /// Read a cache file; a missing or unreadable cache reads as `None`
    pub fn read_from_file(path: &Path) -> Option<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Ignoring unreadable incremental cache {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Ignoring corrupt incremental cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Overwrite the cache file, creating its directory if needed
    pub fn write_to_file(&self, path: &Path) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| BuildError::CacheError(e.to_string()))?;
        fs::write(path, content).map_err(|e| BuildError::io(path, e))
    }
}
