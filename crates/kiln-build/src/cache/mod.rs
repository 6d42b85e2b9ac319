//! Persistent build state
//!
//! Two small files live in each project's intermediate directory:
//! - the incremental cache, a snapshot of the last evaluated [`CompilerIO`](crate::io::CompilerIO)
//! - the tool version stamp, written after every build of the project

pub mod incremental;
pub mod stamp;

pub use incremental::IncrementalCache;
pub use stamp::{read_stamp, write_stamp, ToolVersion};
