use super::{CacheError, CacheKey, CacheResult, PageCache};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const URL_HEADER_PREFIX: &str = "<!-- url: ";
const URL_HEADER_SUFFIX: &str = " -->";

/// Filesystem page cache
///
/// Each body lives in `{dir}/{digest}.html`. The first line of the file records
/// the canonical URL the body was fetched from; a read whose recorded URL differs
/// from the key's URL is treated as a miss.
#[derive(Debug)]
pub struct FsPageCache {
    dir: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsPageCache {
    /// Opens (creating if needed) the cache directory and checks it is writable
    pub fn new(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();

        fs::create_dir_all(&dir).map_err(|source| CacheError::Unwritable {
            path: dir.clone(),
            source,
        })?;

        let check = dir.join(format!(".write-check-{}", std::process::id()));
        fs::write(&check, b"check").map_err(|source| CacheError::Unwritable {
            path: dir.clone(),
            source,
        })?;
        let _ = fs::remove_file(&check);

        Ok(Self {
            dir,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.html", key.digest()))
    }

    fn encode(key: &CacheKey, body: &str) -> String {
        format!(
            "{}{}{}\n{}",
            URL_HEADER_PREFIX,
            key.url(),
            URL_HEADER_SUFFIX,
            body
        )
    }
}

impl PageCache for FsPageCache {
    fn get(&self, key: &CacheKey) -> CacheResult<Option<String>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let Some((header, body)) = content.split_once('\n') else {
            tracing::warn!(path = %path.display(), "Cached page has no URL header, ignoring");
            return Ok(None);
        };

        let recorded = header
            .strip_prefix(URL_HEADER_PREFIX)
            .and_then(|h| h.strip_suffix(URL_HEADER_SUFFIX));

        match recorded {
            Some(url) if url == key.url().as_str() => Ok(Some(body.to_string())),
            Some(url) => {
                tracing::warn!(
                    digest = key.digest(),
                    expected = %key.url(),
                    found = url,
                    "Cache key collision, treating as miss"
                );
                Ok(None)
            }
            None => {
                tracing::warn!(path = %path.display(), "Cached page has a malformed URL header, ignoring");
                Ok(None)
            }
        }
    }

    fn put(&self, key: &CacheKey, body: &str) -> CacheResult<()> {
        let path = self.path_for(key);
        let encoded = Self::encode(key, body);

        match fs::read_to_string(&path) {
            Ok(existing) if existing == encoded => return Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(CacheError::Io { path, source }),
        }

        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(
            ".{}.{}-{}.tmp",
            key.digest(),
            std::process::id(),
            seq
        ));

        fs::write(&tmp, encoded.as_bytes()).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;

        if let Err(source) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(CacheError::Io { path, source });
        }

        Ok(())
    }
}
