//! Page cache
//!
//! Maps a normalized request URL (through its [`CacheKey`]) to the page body
//! fetched for it, so re-runs never fetch the same page twice.
//!
//! - [`FsPageCache`] persists bodies on disk, one file per key
//! - [`MemoryPageCache`] keeps bodies in memory

mod fs;
mod memory;

pub use crate::request::CacheKey;
pub use fs::FsPageCache;
pub use memory::MemoryPageCache;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by page cache implementations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache directory {path} is not writable: {source}")]
    Unwritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Result type alias for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Content store keyed by request identity
///
/// Implementations must tolerate concurrent calls for distinct keys and for the
/// same key. `put` is idempotent: writing identical content again is a no-op and
/// writing different content replaces the stored body.
pub trait PageCache: Send + Sync {
    /// Returns the stored body for `key`, or `None` on a miss
    fn get(&self, key: &CacheKey) -> CacheResult<Option<String>>;

    /// Stores `body` under `key`
    fn put(&self, key: &CacheKey, body: &str) -> CacheResult<()>;
}
