//! Folding restore fragments into a master lock file
//!
//! Each fragment comes from an independent restore of one target or runtime,
//! so fragments are expected to be disjoint. Records that share an identity
//! must agree exactly; anything else is reported instead of being resolved.

use crate::lockfile::{LockFile, LockLibrary, LockTarget, ProjectReference, TargetLibrary};
use crate::Result;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MergeError {
    #[error("Conflicting {kind} '{identity}' while merging lock fragments")]
    Conflict { kind: &'static str, identity: String },
}

/// Apply `fragments` to `master` in order
pub fn merge<I>(mut master: LockFile, fragments: I) -> std::result::Result<LockFile, MergeError>
where
    I: IntoIterator<Item = LockFile>,
{
    for fragment in fragments {
        master.merge_with(fragment)?;
    }
    Ok(master)
}

impl LockFile {
    /// Merge one fragment into this lock file
    pub fn merge_with(&mut self, fragment: LockFile) -> std::result::Result<(), MergeError> {
        for library in fragment.libraries {
            union_into(&mut self.libraries, library, "library", library_identity)?;
        }

        for target in fragment.targets {
            merge_target(&mut self.targets, target)?;
        }

        for project in fragment.projects {
            union_into(&mut self.projects, project, "project reference", |p: &ProjectReference| {
                p.path.display().to_string()
            })?;
        }

        Ok(())
    }

    /// Read `master_path` and fold in each fragment file in order
    pub fn read_with_fragments<P: AsRef<Path>>(master_path: &Path, fragment_paths: &[P]) -> Result<Self> {
        let master = Self::from_file(master_path)?;
        let fragments = fragment_paths
            .iter()
            .map(|p| Self::from_file(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(merge(master, fragments)?)
    }

    /// Read a project's lock file, folding in its companion export file when one exists
    pub fn load(lock_path: &Path) -> Result<Self> {
        let export_path = Self::export_path_for(lock_path);
        if export_path.is_file() {
            Self::read_with_fragments(lock_path, &[export_path])
        } else {
            Self::from_file(lock_path)
        }
    }
}

fn merge_target(
    targets: &mut Vec<LockTarget>,
    incoming: LockTarget,
) -> std::result::Result<(), MergeError> {
    let position = targets
        .iter()
        .position(|t| t.framework == incoming.framework && t.runtime == incoming.runtime);

    let Some(position) = position else {
        targets.push(incoming);
        return Ok(());
    };

    let existing = &mut targets[position];
    let target_name = existing.display_name();
    for library in incoming.libraries {
        union_into(
            &mut existing.libraries,
            library,
            "target library",
            |l: &TargetLibrary| format!("{}/{} in {}", l.name, l.version, target_name),
        )?;
    }
    Ok(())
}

fn library_identity(library: &LockLibrary) -> String {
    format!("{}/{}", library.name, library.version)
}

/// Push `incoming` unless an identical record exists; same identity with different content is a conflict
fn union_into<T, F>(
    items: &mut Vec<T>,
    incoming: T,
    kind: &'static str,
    identity: F,
) -> std::result::Result<(), MergeError>
where
    T: PartialEq,
    F: Fn(&T) -> String,
{
    let key = identity(&incoming);
    match items.iter().find(|item| identity(item) == key) {
        Some(existing) if *existing == incoming => Ok(()),
        Some(_) => Err(MergeError::Conflict {
            kind,
            identity: key,
        }),
        None => {
            items.push(incoming);
            Ok(())
        }
    }
}
