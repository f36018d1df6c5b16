//! In-memory cache of configuration file contents
//!
//! Each absolute path is read from disk at most once per loader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct ContentCache {
    entries: HashMap<PathBuf, String>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached content for `path`, invoking `loader` only on a miss.
    /// Failed loads are not cached.
    pub fn fetch<F, E>(&mut self, path: &Path, loader: F) -> Result<String, E>
    where
        F: FnOnce() -> Result<String, E>,
    {
        if let Some(content) = self.entries.get(path) {
            return Ok(content.clone());
        }

        let content = loader()?;
        self.entries.insert(path.to_path_buf(), content.clone());
        Ok(content)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
