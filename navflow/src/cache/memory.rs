//! In-process cache backend

use super::entry::{CacheEntry, CacheKey};
use super::GraphCacheBackend;
use crate::error::Result;
use dashmap::DashMap;

/// Keeps cache entries in a concurrent map; not shared between processes
#[derive(Debug, Default)]
pub struct MemoryCacheBackend {
    entries: DashMap<CacheKey, CacheEntry>,
}

impl MemoryCacheBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphCacheBackend for MemoryCacheBackend {
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        Ok(self.entries.get(key).map(|e| e.value().clone()))
    }

    fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        self.entries.insert(key.clone(), entry.clone());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&self) -> Result<usize> {
        let count = self.entries.len();
        self.entries.clear();
        Ok(count)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
