//! Error types for navigation, caching and pathfinding
//!
//! Every kind here is raised immediately to the caller. Nothing in the
//! navigation stack retries internally or falls back to stale data.

use std::io;
use thiserror::Error;

/// The main error type for the navflow library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NavigationError {
    /// A tree or tree hierarchy could not be loaded or assembled
    #[error("Navigation tree error for tree '{tree_id}': {reason}")]
    NavigationTree {
        /// Tree that could not be loaded or assembled
        tree_id: String,
        /// What went wrong
        reason: String,
    },

    /// The unified graph for a root tree is not available in the cache
    #[error("Unified graph cache error for root tree '{root_tree_id}' (team '{team_id}'): {reason}")]
    UnifiedCache {
        /// Root tree the graph was requested for
        root_tree_id: String,
        /// Team owning the tree
        team_id: String,
        /// What went wrong
        reason: String,
    },

    /// A target could not be resolved, is not navigable, or cannot be reached
    #[error("Pathfinding error in tree '{tree_id}': {reason}")]
    Pathfinding {
        /// Root tree the search ran over
        tree_id: String,
        /// Offending node reference, if one is known
        node: Option<String>,
        /// What went wrong
        reason: String,
    },

    /// A failure specific to crossing between trees
    #[error("Cross-tree navigation error from tree '{from_tree_id}' to tree '{to_tree_id}': {reason}")]
    CrossTreeNavigation {
        /// Tree being left
        from_tree_id: String,
        /// Tree being entered
        to_tree_id: String,
        /// What went wrong
        reason: String,
    },

    /// The underlying data loader failed
    #[error("Database error: {0}")]
    Database(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NavigationError {
    /// Create a navigation tree error
    pub fn tree(tree_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NavigationTree {
            tree_id: tree_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a unified cache error
    pub fn cache(
        root_tree_id: impl Into<String>,
        team_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnifiedCache {
            root_tree_id: root_tree_id.into(),
            team_id: team_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a pathfinding error that is not tied to a node
    pub fn pathfinding(tree_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Pathfinding {
            tree_id: tree_id.into(),
            node: None,
            reason: reason.into(),
        }
    }

    /// Create a pathfinding error naming the offending node reference
    pub fn pathfinding_at(
        tree_id: impl Into<String>,
        node: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Pathfinding {
            tree_id: tree_id.into(),
            node: Some(node.into()),
            reason: reason.into(),
        }
    }

    /// Whether this error means the unified graph must be (re)built first
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, Self::UnifiedCache { .. })
    }
}

/// Result type alias for navflow operations
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Extension trait for attaching tree context to loader results
pub trait LoaderResultExt<T> {
    /// Map any error into a [`NavigationError::Database`] with a context prefix
    fn database_context(self, context: &str) -> Result<T>;
}

impl<T, E> LoaderResultExt<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn database_context(self, context: &str) -> Result<T> {
        self.map_err(|e| NavigationError::Database(format!("{context}: {e}")))
    }
}
