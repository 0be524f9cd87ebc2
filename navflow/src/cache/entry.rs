//! Cache keys and persisted entries

use crate::graph::UnifiedGraph;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifies one cached unified graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    /// Root tree of the hierarchy
    pub root_tree_id: String,
    /// Team owning the hierarchy
    pub team_id: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(root_tree_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            root_tree_id: root_tree_id.into(),
            team_id: team_id.into(),
        }
    }

    /// File-system safe stem for this key
    ///
    /// Both parts are hex encoded and joined with `.`, so distinct keys never
    /// share a stem.
    pub fn file_stem(&self) -> String {
        format!(
            "unified_graph_{}.{}",
            hex_encode(&self.root_tree_id),
            hex_encode(&self.team_id)
        )
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.root_tree_id, self.team_id)
    }
}

fn hex_encode(part: &str) -> String {
    part.bytes().map(|b| format!("{:02x}", b)).collect()
}

/// A unified graph together with the time it was built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key the graph was stored under
    pub key: CacheKey,
    /// The cached graph
    pub graph: UnifiedGraph,
    /// When the graph was stored
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(key: CacheKey, graph: UnifiedGraph) -> Self {
        Self {
            key,
            graph,
            timestamp: Utc::now(),
        }
    }

    /// Age of the entry; zero if the timestamp lies in the future
    pub fn age(&self) -> Duration {
        (Utc::now() - self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Whether the entry is at least `ttl` old
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }
}
