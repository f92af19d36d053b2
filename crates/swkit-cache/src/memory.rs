//! In-memory cache storage.

use async_trait::async_trait;
use indexmap::IndexMap;
use swkit_net::{Request, Response};
use tokio::sync::RwLock;
use tracing::trace;

use crate::{ensure_cacheable_request, CacheError, CacheStorage};

/// A single named cache.
#[derive(Debug, Default)]
struct Cache {
    entries: IndexMap<String, Response>,
}

impl Cache {
    fn size(&self) -> usize {
        self.entries.values().map(|r| r.body.len()).sum()
    }
}

/// Cache storage living for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<IndexMap<String, Cache>>,
    quota: Option<usize>,
}

impl MemoryCacheStorage {
    /// Create new cache storage without a quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create cache storage that refuses writes once the bodies of all
    /// cached responses would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            caches: RwLock::default(),
            quota: Some(bytes),
        }
    }

    /// Total body bytes across all caches.
    pub async fn usage(&self) -> usize {
        self.caches.read().await.values().map(Cache::size).sum()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, cache: &str) -> Result<(), CacheError> {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default();
        Ok(())
    }

    async fn has(&self, cache: &str) -> Result<bool, CacheError> {
        Ok(self.caches.read().await.contains_key(cache))
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool, CacheError> {
        Ok(self.caches.write().await.shift_remove(cache).is_some())
    }

    async fn cache_names(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn match_request(&self, cache: &str, url: &str) -> Result<Option<Response>, CacheError> {
        let caches = self.caches.read().await;
        Ok(caches
            .get(cache)
            .and_then(|c| c.entries.get(url))
            .cloned())
    }

    async fn put(
        &self,
        cache: &str,
        request: &Request,
        response: &Response,
    ) -> Result<(), CacheError> {
        ensure_cacheable_request(request)?;
        let key = request.url.to_string();

        let mut caches = self.caches.write().await;

        if let Some(quota) = self.quota {
            let usage: usize = caches.values().map(Cache::size).sum();
            let replaced = caches
                .get(cache)
                .and_then(|c| c.entries.get(&key))
                .map_or(0, |r| r.body.len());
            let available = quota.saturating_sub(usage - replaced);
            if response.body.len() > available {
                return Err(CacheError::QuotaExceeded {
                    cache: cache.to_string(),
                    key,
                    needed: response.body.len(),
                    available,
                });
            }
        }

        let entries = &mut caches.entry(cache.to_string()).or_default().entries;
        // A rewrite moves the key to the end, like a delete followed by an add.
        entries.shift_remove(&key);
        trace!(cache, key = %key, "Cache put");
        entries.insert(key, response.copy_without_redirect());
        Ok(())
    }

    async fn delete(&self, cache: &str, url: &str) -> Result<bool, CacheError> {
        let mut caches = self.caches.write().await;
        Ok(caches
            .get_mut(cache)
            .is_some_and(|c| c.entries.shift_remove(url).is_some()))
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>, CacheError> {
        let caches = self.caches.read().await;
        Ok(caches
            .get(cache)
            .map(|c| c.entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}
