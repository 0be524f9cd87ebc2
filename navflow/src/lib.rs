//! # Navflow
//!
//! Navigation pathfinding and test-case execution for remote-controlled devices.
//!
//! ## Features
//!
//! - **Unified graphs**: merge a hierarchy of navigation trees into one graph
//!   stitched with virtual enter/exit edges
//! - **Graph cache**: TTL cache of unified graphs, shareable across processes
//! - **Pathfinding**: label or id resolution and deterministic shortest paths
//! - **Navigation**: drive a device along a path through pluggable executors
//! - **Workflows**: validate and run block-graph test cases, in the foreground
//!   or in the background with progress polling and cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use navflow::{GraphBuilder, GraphCache, PathFinder, TreeData};
//! use std::time::Duration;
//!
//! # fn main() -> navflow::Result<()> {
//! let trees: Vec<TreeData> = Vec::new();
//! let graph = GraphBuilder::new().build(&trees)?;
//!
//! let cache = GraphCache::in_memory(Duration::from_secs(3600));
//! cache.put("root-tree", "team", &graph)?;
//!
//! let finder = PathFinder::new(cache);
//! let transitions = finder.find_path("root-tree", "Settings", "team", None)?;
//! for transition in &transitions {
//!     println!("{}", transition.describe());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Graph cache
pub mod cache;

/// Configuration loading
pub mod config;

/// Error types
pub mod error;

/// Navigation graph model and construction
pub mod graph;

/// Tree and test-case loading
pub mod loader;

/// Device navigation
pub mod navigation;

/// Node resolution and shortest paths
pub mod pathfinding;

/// Test-case workflows
pub mod workflow;

#[cfg(test)]
mod test_helpers;

pub use cache::{CacheStats, GraphCache};
pub use config::Config;
pub use error::{NavigationError, Result};
pub use graph::{GraphBuilder, TreeData, UnifiedGraph};
pub use loader::{populate_cache, JsonDirectoryLoader, TreeLoader};
pub use navigation::{NavigationExecutor, NavigationPlan, NavigationResult, PositionTracker};
pub use pathfinding::{PathFinder, ResolvedPath, Transition};
pub use workflow::{
    validate, BlockGraph, ExecutionId, ExecutionRegistry, ExecutionStatus, ValidationReport,
    WorkflowExecutor, WorkflowResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::navigation::{ActionExecutor, SimulatedDevice, VerificationExecutor};
    pub use crate::{
        BlockGraph, Config, ExecutionRegistry, GraphBuilder, GraphCache, NavigationError,
        NavigationExecutor, PathFinder, Result, TreeData, UnifiedGraph, WorkflowExecutor,
    };
}
