use super::{CacheError, CacheKey, CacheResult, PageCache};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// In-memory page cache, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryPageCache {
    pages: Mutex<HashMap<String, (Url, String)>>,
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pages
    pub fn len(&self) -> usize {
        self.pages.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a body is stored for `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

impl PageCache for MemoryPageCache {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<String>> {
        let pages = self.pages.lock().map_err(|_| CacheError::LockPoisoned)?;
        Ok(pages
            .get(key.digest())
            .filter(|(url, _)| url == key.url())
            .map(|(_, body)| body.clone()))
    }

    fn put(&self, key: &CacheKey, body: &str) -> CacheResult<()> {
        let mut pages = self.pages.lock().map_err(|_| CacheError::LockPoisoned)?;
        pages.insert(
            key.digest().to_string(),
            (key.url().clone(), body.to_string()),
        );
        Ok(())
    }
}
