//! Lock command - merge and check lock files

use anyhow::{Context, Result};
use clap::Subcommand;
use kiln_lock::LockFile;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum LockCommand {
    /// Merge lock file fragments into a master lock file
    ///
    /// Fragments are applied in order. Entries that already exist must be
    /// identical; a conflicting entry aborts the merge.
    ///
    /// EXAMPLES:
    ///     kiln lock merge kiln.lock linux.lock win.lock
    ///     kiln lock merge kiln.lock extra.lock -o merged.lock
    Merge {
        /// Master lock file
        master: PathBuf,
        /// Fragments to merge into the master
        #[arg(required = true)]
        fragments: Vec<PathBuf>,
        /// Write the merged lock file here instead of over the master
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Check a lock file for duplicate entries and unsupported versions
    Verify {
        /// Lock file to check
        #[arg(default_value = "kiln.lock")]
        path: PathBuf,
    },
}

pub fn run(command: LockCommand) -> Result<()> {
    match command {
        LockCommand::Merge {
            master,
            fragments,
            output,
        } => merge(master, &fragments, output),
        LockCommand::Verify { path } => verify(&path),
    }
}

fn merge(master: PathBuf, fragments: &[PathBuf], output: Option<PathBuf>) -> Result<()> {
    let merged = LockFile::read_with_fragments(&master, fragments)
        .with_context(|| format!("Failed to merge fragments into {}", master.display()))?;
    merged
        .verify()
        .context("Merged lock file is invalid")?;

    let output = output.unwrap_or(master);
    merged
        .write_to_file(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        "Merged {} fragment(s) into {}",
        fragments.len(),
        output.display()
    );
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let lock = LockFile::load(path).with_context(|| format!("Failed to read {}", path.display()))?;
    lock.verify()
        .with_context(|| format!("{} is invalid", path.display()))?;

    info!(
        "{} is valid ({} libraries, {} targets)",
        path.display(),
        lock.libraries.len(),
        lock.targets.len()
    );
    Ok(())
}
