//! TTL cache of unified graphs keyed by (root tree, team)
//!
//! A [`GraphCache`] is the single authoritative cache instance handed to the
//! pathfinder. Expiry is lazy: an entry at least TTL old reads as absent and
//! is removed by that read. Unreadable entries are treated the same way.

pub mod entry;
pub mod file;
pub mod memory;

pub use entry::{CacheEntry, CacheKey};
pub use file::FileCacheBackend;
pub use memory::MemoryCacheBackend;

use crate::config::Config;
use crate::error::Result;
use crate::graph::UnifiedGraph;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Storage behind a [`GraphCache`]
pub trait GraphCacheBackend: Send + Sync {
    /// Read an entry; `Err` means the entry exists but cannot be decoded or read
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>>;

    /// Store an entry, replacing any prior value atomically
    fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()>;

    /// Remove an entry, returning whether it existed
    fn remove(&self, key: &CacheKey) -> Result<bool>;

    /// Remove every entry, returning how many were removed
    fn clear(&self) -> Result<usize>;

    /// Number of stored entries, expired ones included
    fn len(&self) -> Result<usize>;

    /// Human-readable location for diagnostics
    fn location(&self) -> String;
}

/// Cache statistics for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently persisted
    pub entries: usize,
    /// Where entries are persisted
    pub location: String,
    /// Reads that returned a graph
    pub hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
    /// Misses caused by an expired entry
    pub expired: u64,
    /// Misses caused by an unreadable entry
    pub corrupt: u64,
}

impl CacheStats {
    /// Fraction of reads that were hits
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    expired: u64,
    corrupt: u64,
}

/// Cache of built unified graphs with lazy TTL expiry
#[derive(Clone)]
pub struct GraphCache {
    backend: Arc<dyn GraphCacheBackend>,
    ttl: Duration,
    counters: Arc<Mutex<Counters>>,
}

impl std::fmt::Debug for GraphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphCache")
            .field("location", &self.backend.location())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl GraphCache {
    /// Create a cache over any backend
    pub fn new(backend: Arc<dyn GraphCacheBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            counters: Arc::new(Mutex::new(Counters::default())),
        }
    }

    /// Create a file-backed cache in `dir`
    pub fn file(dir: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        Ok(Self::new(Arc::new(FileCacheBackend::new(dir)?), ttl))
    }

    /// Create an in-memory cache
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryCacheBackend::new()), ttl)
    }

    /// Create the file-backed cache described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::file(&config.cache_dir, config.cache_ttl())
    }

    /// Configured time to live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn counters(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get the graph for a key if present and younger than the TTL
    pub fn get(&self, root_tree_id: &str, team_id: &str) -> Option<UnifiedGraph> {
        let key = CacheKey::new(root_tree_id, team_id);
        match self.backend.load(&key) {
            Ok(Some(entry)) if entry.key != key => {
                self.counters().misses += 1;
                tracing::warn!(
                    tree_id = root_tree_id,
                    team_id,
                    stored_key = %entry.key,
                    "Ignoring unified graph cache entry stored under another key"
                );
                None
            }
            Ok(Some(entry)) if !entry.is_expired(self.ttl) => {
                self.counters().hits += 1;
                tracing::debug!(tree_id = root_tree_id, team_id, "Unified graph cache hit");
                Some(entry.graph)
            }
            Ok(Some(entry)) => {
                {
                    let mut counters = self.counters();
                    counters.misses += 1;
                    counters.expired += 1;
                }
                tracing::debug!(
                    tree_id = root_tree_id,
                    team_id,
                    age_secs = entry.age().as_secs(),
                    "Unified graph cache entry expired"
                );
                self.discard(&key);
                None
            }
            Ok(None) => {
                self.counters().misses += 1;
                tracing::debug!(tree_id = root_tree_id, team_id, "Unified graph cache miss");
                None
            }
            Err(e) => {
                {
                    let mut counters = self.counters();
                    counters.misses += 1;
                    counters.corrupt += 1;
                }
                tracing::warn!(
                    tree_id = root_tree_id,
                    team_id,
                    "Discarding unreadable unified graph cache entry: {}",
                    e
                );
                self.discard(&key);
                None
            }
        }
    }

    fn discard(&self, key: &CacheKey) {
        if let Err(e) = self.backend.remove(key) {
            tracing::warn!("Failed to remove cache entry {}: {}", key, e);
        }
    }

    /// Store a graph, replacing any prior entry for the key
    pub fn put(&self, root_tree_id: &str, team_id: &str, graph: &UnifiedGraph) -> Result<()> {
        self.put_with_timestamp(root_tree_id, team_id, graph, Utc::now())
    }

    /// Store a graph with an explicit build timestamp
    pub fn put_with_timestamp(
        &self,
        root_tree_id: &str,
        team_id: &str,
        graph: &UnifiedGraph,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let key = CacheKey::new(root_tree_id, team_id);
        let entry = CacheEntry {
            key: key.clone(),
            graph: graph.clone(),
            timestamp,
        };
        self.backend.store(&key, &entry)?;
        tracing::debug!(
            tree_id = root_tree_id,
            team_id,
            nodes = graph.node_count(),
            "Stored unified graph"
        );
        Ok(())
    }

    /// Whether a live entry exists, without counting or removing anything
    pub fn is_cached(&self, root_tree_id: &str, team_id: &str) -> bool {
        let key = CacheKey::new(root_tree_id, team_id);
        matches!(
            self.backend.load(&key),
            Ok(Some(entry)) if entry.key == key && !entry.is_expired(self.ttl)
        )
    }

    /// Remove the entry for one key
    pub fn invalidate(&self, root_tree_id: &str, team_id: &str) -> Result<bool> {
        let removed = self.backend.remove(&CacheKey::new(root_tree_id, team_id))?;
        tracing::debug!(tree_id = root_tree_id, team_id, removed, "Invalidated unified graph");
        Ok(removed)
    }

    /// Remove every entry
    pub fn invalidate_all(&self) -> Result<usize> {
        let removed = self.backend.clear()?;
        tracing::info!(removed, "Cleared unified graph cache");
        Ok(removed)
    }

    /// Entry count, location and read counters
    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.backend.len()?;
        let counters = self.counters();
        Ok(CacheStats {
            entries,
            location: self.backend.location(),
            hits: counters.hits,
            misses: counters.misses,
            expired: counters.expired,
            corrupt: counters.corrupt,
        })
    }
}
