//! File-backed cache shared between processes
//!
//! One JSON file per key. Writes go to a uniquely named temp file in the same
//! directory and are renamed into place, so readers never see a partial entry.

use super::entry::{CacheEntry, CacheKey};
use super::GraphCacheBackend;
use crate::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const ENTRY_EXTENSION: &str = "json";

/// Stores cache entries as JSON files in a directory
#[derive(Debug, Clone)]
pub struct FileCacheBackend {
    dir: PathBuf,
}

impl FileCacheBackend {
    /// Create a backend over `dir`, creating the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.file_stem(), ENTRY_EXTENSION))
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION)
            {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl GraphCacheBackend for FileCacheBackend {
    fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: CacheEntry = serde_json::from_slice(&content)?;
        Ok(Some(entry))
    }

    fn store(&self, key: &CacheKey, entry: &CacheEntry) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let temp_path = self
            .dir
            .join(format!("{}.{}.tmp", key.file_stem(), ulid::Ulid::new()));

        let content = serde_json::to_vec(entry)?;
        if let Err(e) = std::fs::write(&temp_path, content) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        if let Err(e) = std::fs::rename(&temp_path, &path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<bool> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_files()? {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entry_files()?.len())
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}
