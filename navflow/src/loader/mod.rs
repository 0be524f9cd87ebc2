//! Loading tree hierarchies and test cases, and warming the graph cache

mod directory;

pub use directory::JsonDirectoryLoader;

use crate::cache::GraphCache;
use crate::error::{NavigationError, Result};
use crate::graph::{GraphBuilder, TreeData, UnifiedGraph};
use crate::workflow::BlockGraph;
use async_trait::async_trait;

/// Source of tree and test-case definitions
///
/// Implementations surface storage failures as [`NavigationError::Database`]
/// and missing or ill-formed hierarchies as [`NavigationError::NavigationTree`].
#[async_trait]
pub trait TreeLoader: Send + Sync {
    /// The root tree followed by all of its descendants, shallowest first
    async fn load_tree_hierarchy(&self, root_tree_id: &str, team_id: &str)
        -> Result<Vec<TreeData>>;

    /// The root tree of a user interface
    async fn load_tree_by_interface(&self, interface_name: &str, team_id: &str)
        -> Result<TreeData>;

    /// A saved test case as a block graph
    async fn load_test_case(&self, name: &str, team_id: &str) -> Result<BlockGraph>;
}

/// Load a hierarchy, build its unified graph and store it in `cache`
///
/// This is the only way graphs get into the cache; pathfinding never loads.
pub async fn populate_cache(
    loader: &dyn TreeLoader,
    cache: &GraphCache,
    root_tree_id: &str,
    team_id: &str,
) -> Result<UnifiedGraph> {
    let trees = loader.load_tree_hierarchy(root_tree_id, team_id).await?;
    if trees.first().map(|t| t.tree_id.as_str()) != Some(root_tree_id) {
        return Err(NavigationError::tree(
            root_tree_id,
            "Loaded hierarchy does not start with the requested root tree",
        ));
    }

    let graph = GraphBuilder::new().build(&trees)?;
    cache.put(root_tree_id, team_id, &graph)?;
    tracing::info!(
        tree_id = root_tree_id,
        team_id,
        trees = trees.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Cached unified graph"
    );
    Ok(graph)
}
