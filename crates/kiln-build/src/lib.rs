//! Kiln build orchestration
//!
//! Decides which projects of a build need compiling and drives an external
//! compiler over them:
//! - Dependency graph loading from manifests and lock files
//! - Dependency build order
//! - Compiler input/output sets and the incremental cache
//! - Rebuild decisions and incremental preconditions
//! - Sequential, fail-fast orchestration with tool version stamping

pub mod cache;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod io;
pub mod oracle;
pub mod orchestrator;
pub mod output;
pub mod preconditions;
pub mod project;
pub mod sort;
pub mod workspace;

// Re-export main types
pub use cache::{IncrementalCache, ToolVersion};
pub use compiler::{dependency_args, root_args, CompileInvoker, ProcessCompileInvoker};
pub use error::{BuildError, BuildResult};
pub use graph::{DependencyGraph, GraphNode, NodeId};
pub use io::{compute_io, CompilerIO, InputDiff};
pub use oracle::{IncrementalResult, StalenessOracle};
pub use orchestrator::{BuildOrchestrator, BuildSummary, ProjectOutcome, ProjectReport};
pub use output::{OutputPaths, STAMP_FILE_NAME};
pub use preconditions::{
    CommandResolution, Precondition, PreconditionCollector, PreconditionSet, ScriptHook,
};
pub use project::{ProjectLockFile, ProjectNode, KNOWN_COMPILERS};
pub use sort::sort;
pub use workspace::load_graph;
