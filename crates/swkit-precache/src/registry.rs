//! Manifest registry.
//!
//! The in-memory view of the manifest: logical URL → cache key (in
//! registration order), cache key → integrity, and URL → cache mode used for
//! the install-time network request. It is filled once when the worker
//! starts and only read afterwards.

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use swkit_net::CacheMode;
use tracing::{debug, warn};
use url::Url;

use crate::cache_key::{derive_cache_key, resolve_url};
use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::ManifestEntry;

/// Outcome of a successful `register` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterReport {
    /// Entries processed.
    pub registered: usize,
    /// URLs registered without revision info, in manifest order. Their cache
    /// key is the URL itself, so they must embed a content hash.
    pub unrevisioned: Vec<String>,
}

/// Logical URL → cache key → integrity metadata.
#[derive(Debug, Clone)]
pub struct ManifestRegistry {
    base: Url,
    urls_to_cache_keys: IndexMap<String, String>,
    urls_to_cache_modes: HashMap<String, CacheMode>,
    cache_keys_to_integrities: HashMap<String, String>,
}

impl ManifestRegistry {
    /// Create an empty registry resolving relative URLs against `base`, the
    /// worker's own location.
    pub fn new(base: Url) -> Self {
        Self {
            base,
            urls_to_cache_keys: IndexMap::new(),
            urls_to_cache_modes: HashMap::new(),
            cache_keys_to_integrities: HashMap::new(),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Merge entries into the registry.
    ///
    /// Re-registering an identical entry is a no-op. The batch stops at the
    /// first conflicting or invalid entry; entries before it stay registered.
    pub fn register(&mut self, entries: &[ManifestEntry]) -> PrecacheResult<RegisterReport> {
        let mut report = RegisterReport::default();

        for entry in entries {
            let key = derive_cache_key(entry, &self.base)?;

            if entry.revision().is_none() {
                report.unrevisioned.push(key.url.clone());
            }

            if let Some(existing) = self.urls_to_cache_keys.get(&key.url) {
                if *existing != key.cache_key {
                    return Err(PrecacheError::ConflictingEntry {
                        url: key.url,
                        first_cache_key: existing.clone(),
                        second_cache_key: key.cache_key,
                    });
                }
            }

            if let Some(integrity) = entry.integrity() {
                if let Some(existing) = self.cache_keys_to_integrities.get(&key.cache_key) {
                    if existing != integrity {
                        return Err(PrecacheError::ConflictingIntegrity {
                            cache_key: key.cache_key,
                            first: existing.clone(),
                            second: integrity.to_string(),
                        });
                    }
                }
                self.cache_keys_to_integrities
                    .insert(key.cache_key.clone(), integrity.to_string());
            }

            let cache_mode = if entry.revision().is_some() {
                CacheMode::Reload
            } else {
                CacheMode::Default
            };

            debug!(url = %key.url, cache_key = %key.cache_key, "Registered precache entry");
            self.urls_to_cache_modes.insert(key.url.clone(), cache_mode);
            self.urls_to_cache_keys.insert(key.url, key.cache_key);
            report.registered += 1;
        }

        if !report.unrevisioned.is_empty() {
            warn!(
                count = report.unrevisioned.len(),
                urls = ?report.unrevisioned,
                "Precaching entries without revision info; their URLs must change when their content does"
            );
        }

        Ok(report)
    }

    /// Cache key for a URL, resolved the same way manifest URLs are.
    pub fn lookup_cache_key(&self, url: &str) -> Option<&str> {
        let resolved = resolve_url(url, &self.base).ok()?;
        self.urls_to_cache_keys
            .get(resolved.as_str())
            .map(String::as_str)
    }

    /// Integrity metadata declared for a cache key.
    pub fn lookup_integrity(&self, cache_key: &str) -> Option<&str> {
        self.cache_keys_to_integrities
            .get(cache_key)
            .map(String::as_str)
    }

    /// Cache mode for the install-time request of a URL.
    pub fn cache_mode(&self, url: &str) -> CacheMode {
        self.urls_to_cache_modes
            .get(url)
            .copied()
            .unwrap_or_default()
    }

    /// The full URL → cache key mapping, in registration order.
    pub fn urls_to_cache_keys(&self) -> &IndexMap<String, String> {
        &self.urls_to_cache_keys
    }

    /// All registered URLs, in registration order.
    pub fn cached_urls(&self) -> Vec<String> {
        self.urls_to_cache_keys.keys().cloned().collect()
    }

    /// The set of keys the precache should contain.
    pub fn expected_cache_keys(&self) -> HashSet<&str> {
        self.urls_to_cache_keys.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.urls_to_cache_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls_to_cache_keys.is_empty()
    }
}
