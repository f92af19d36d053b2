//! On-disk cache storage.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<sha256(cache name)>/NAME          cache name, verbatim
//! <root>/<sha256(cache name)>/<sha256(key)>.json
//! ```
//!
//! Entries are written to a temporary file and renamed into place, so a
//! reader never observes a partially written entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use swkit_net::{Request, Response};
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::{ensure_cacheable_request, CacheEntry, CacheError, CacheStorage};

const NAME_FILE: &str = "NAME";
const ENTRY_EXT: &str = "json";

fn hashed(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

/// Cache storage persisted to a directory.
#[derive(Debug)]
pub struct DiskCacheStorage {
    root: PathBuf,
    sequence: AtomicU64,
}

impl DiskCacheStorage {
    /// Open (creating if needed) a storage rooted at `root`.
    pub async fn open_root(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Disk cache storage opened");

        let storage = Self {
            root,
            sequence: AtomicU64::new(0),
        };
        let last = storage.max_sequence().await?;
        storage.sequence.store(last, Ordering::SeqCst);
        Ok(storage)
    }

    fn cache_dir(&self, cache: &str) -> PathBuf {
        self.root.join(hashed(cache))
    }

    fn entry_path(&self, cache: &str, url: &str) -> PathBuf {
        self.cache_dir(cache)
            .join(format!("{}.{}", hashed(url), ENTRY_EXT))
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn read_entry(path: &Path) -> Result<Option<CacheEntry>, CacheError> {
        let data = match fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| CacheError::CorruptEntry {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    async fn entries(&self, cache: &str) -> Result<Vec<CacheEntry>, CacheError> {
        let dir = self.cache_dir(cache);
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(item) = read_dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            match Self::read_entry(&path).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Skipping unreadable cache entry"),
            }
        }
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn max_sequence(&self) -> Result<u64, CacheError> {
        let mut max = 0;
        for cache in self.cache_names().await? {
            if let Some(last) = self.entries(&cache).await?.last() {
                max = max.max(last.sequence);
            }
        }
        Ok(max)
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, cache: &str) -> Result<(), CacheError> {
        let dir = self.cache_dir(cache);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(NAME_FILE), cache.as_bytes()).await?;
        Ok(())
    }

    async fn has(&self, cache: &str) -> Result<bool, CacheError> {
        Ok(fs::try_exists(self.cache_dir(cache).join(NAME_FILE)).await?)
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, CacheError> {
        match fs::remove_dir_all(self.cache_dir(cache)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn cache_names(&self) -> Result<Vec<String>, CacheError> {
        let mut names = Vec::new();
        let mut read_dir = fs::read_dir(&self.root).await?;
        while let Some(item) = read_dir.next_entry().await? {
            match fs::read_to_string(item.path().join(NAME_FILE)).await {
                Ok(name) => names.push(name),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        names.sort();
        Ok(names)
    }

    async fn match_request(&self, cache: &str, url: &str) -> Result<Option<Response>, CacheError> {
        let path = self.entry_path(cache, url);
        let Some(entry) = Self::read_entry(&path).await? else {
            return Ok(None);
        };
        // Guard against hash collisions and stale renames.
        if entry.key != url {
            return Ok(None);
        }
        entry
            .to_response()
            .map(Some)
            .map_err(|message| CacheError::CorruptEntry {
                path: path.display().to_string(),
                message,
            })
    }

    async fn put(
        &self,
        cache: &str,
        request: &Request,
        response: &Response,
    ) -> Result<(), CacheError> {
        ensure_cacheable_request(request)?;
        self.open(cache).await?;

        let entry = CacheEntry::new(request, response, self.next_sequence());
        let path = self.entry_path(cache, &entry.key);
        let tmp = path.with_extension(format!("tmp-{}", entry.sequence));

        let data = serde_json::to_vec(&entry).map_err(|e| CacheError::CorruptEntry {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let written = match fs::write(&tmp, data).await {
            Ok(()) => fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            match fs::remove_file(&tmp).await {
                Ok(()) => {}
                Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
                Err(cleanup) => {
                    warn!(path = %tmp.display(), error = %cleanup, "Failed to remove temp entry")
                }
            }
            return Err(e.into());
        }

        trace!(cache, key = %entry.key, "Cache put");
        Ok(())
    }

    async fn delete(&self, cache: &str, url: &str) -> Result<bool, CacheError> {
        match fs::remove_file(self.entry_path(cache, url)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>, CacheError> {
        Ok(self
            .entries(cache)
            .await?
            .into_iter()
            .map(|e| e.key)
            .collect())
    }
}
