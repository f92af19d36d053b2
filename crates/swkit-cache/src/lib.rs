//! # SwKit Cache
//!
//! Named request/response caches, the storage a service worker sees as
//! `caches`.
//!
//! ## Architecture
//!
//! ```text
//! CacheStorage (caches)
//!     │
//!     ├── MemoryCacheStorage   (process lifetime, optional byte quota)
//!     └── DiskCacheStorage     (one directory per cache, survives restarts)
//!             └── cache name
//!                     └── request URL → Response
//! ```
//!
//! Caches are addressed by name and created lazily on first write. Keys are
//! absolute request URLs and are listed in insertion order.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use swkit_net::{Request, Response, ResponseType};
use thiserror::Error;
use url::Url;

pub mod disk;
pub mod memory;
pub mod names;
pub mod quota;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;
pub use names::{CacheNameDetails, CacheNames};
pub use quota::QuotaErrorCallbacks;

// ==================== Errors ====================

/// Errors that can occur in cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Quota exceeded writing {key} to {cache} ({needed} bytes needed, {available} available)")]
    QuotaExceeded {
        cache: String,
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("Invalid cache name: `{0}` must not be empty")]
    InvalidCacheName(&'static str),

    #[error("Cannot cache a {0} request")]
    NonGetRequest(Method),

    #[error("Corrupt cache entry {path}: {message}")]
    CorruptEntry { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::QuotaExceeded { .. })
    }
}

// ==================== Storage ====================

/// Named caches of request/response pairs.
///
/// Implementations must tolerate concurrent reads and writes to the same key;
/// the last completed write wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the cache if it does not exist yet.
    async fn open(&self, cache: &str) -> Result<(), CacheError>;

    /// Check if a cache exists.
    async fn has(&self, cache: &str) -> Result<bool, CacheError>;

    /// Delete a whole cache. Returns whether it existed.
    async fn delete_cache(&self, cache: &str) -> Result<bool, CacheError>;

    /// Names of all existing caches.
    async fn cache_names(&self) -> Result<Vec<String>, CacheError>;

    /// Look up the response stored under `url`.
    async fn match_request(&self, cache: &str, url: &str) -> Result<Option<Response>, CacheError>;

    /// Store `response` under the request's URL, replacing any previous entry.
    async fn put(&self, cache: &str, request: &Request, response: &Response)
        -> Result<(), CacheError>;

    /// Delete one entry. Returns whether it existed.
    async fn delete(&self, cache: &str, url: &str) -> Result<bool, CacheError>;

    /// Stored request URLs, oldest write first.
    async fn keys(&self, cache: &str) -> Result<Vec<String>, CacheError>;
}

/// Reject requests the Cache API refuses to store.
pub(crate) fn ensure_cacheable_request(request: &Request) -> Result<(), CacheError> {
    if request.method != Method::GET {
        return Err(CacheError::NonGetRequest(request.method.clone()));
    }
    Ok(())
}

/// Remove the named query parameters from a URL string. Unparseable input is
/// returned unchanged.
pub fn strip_params(url: &str, ignore: &[&str]) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if parsed.query().is_none() {
        return parsed.to_string();
    }

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(name, _)| !ignore.contains(&&**name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.to_string()
}

/// Match `url` in `cache`, treating keys as equal when they only differ in
/// the `ignore`d query parameters.
pub async fn cache_match_ignore_params(
    storage: &dyn CacheStorage,
    cache: &str,
    url: &str,
    ignore: &[&str],
) -> Result<Option<Response>, CacheError> {
    let stripped = strip_params(url, ignore);
    if stripped == url {
        return storage.match_request(cache, url).await;
    }

    for key in storage.keys(cache).await? {
        if strip_params(&key, ignore) == stripped {
            return storage.match_request(cache, &key).await;
        }
    }
    Ok(None)
}

// ==================== Entries ====================

/// A stored request/response pair in serializable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request URL (the cache key).
    pub key: String,

    /// Final response URL.
    pub response_url: String,

    /// Response status.
    pub status: u16,

    /// Response headers, in order, repeated names allowed.
    pub headers: Vec<StoredHeader>,

    /// Response type name, as produced by [`ResponseType::as_str`].
    #[serde(default = "basic_type")]
    pub response_type: String,

    /// Response body.
    #[serde(with = "bytes_base64")]
    pub body: Vec<u8>,

    /// Cached at timestamp (ms since epoch).
    pub cached_at: u64,

    /// Write order within the storage.
    pub sequence: u64,
}

impl CacheEntry {
    /// Build an entry for storing `response` under `request`.
    pub fn new(request: &Request, response: &Response, sequence: u64) -> Self {
        Self {
            key: request.url.to_string(),
            response_url: response.url.to_string(),
            status: response.status.as_u16(),
            headers: response
                .headers
                .iter()
                .map(|(name, value)| StoredHeader {
                    name: name.as_str().to_string(),
                    value: value.as_bytes().to_vec(),
                })
                .collect(),
            response_type: response.response_type.as_str().to_string(),
            body: response.body.to_vec(),
            cached_at: now_millis(),
            sequence,
        }
    }

    /// Rebuild the response. Stored responses are never marked redirected.
    pub fn to_response(&self) -> Result<Response, String> {
        let url = Url::parse(&self.response_url).map_err(|e| e.to_string())?;
        let status = StatusCode::from_u16(self.status).map_err(|e| e.to_string())?;

        let mut headers = HeaderMap::new();
        for header in &self.headers {
            let name = HeaderName::try_from(header.name.as_str()).map_err(|e| e.to_string())?;
            let value = HeaderValue::from_bytes(&header.value).map_err(|e| e.to_string())?;
            headers.append(name, value);
        }
        let response_type = ResponseType::from_name(&self.response_type)
            .ok_or_else(|| format!("unknown response type {:?}", self.response_type))?;

        Ok(Response {
            url,
            status,
            headers,
            body: bytes::Bytes::from(self.body.clone()),
            redirected: false,
            response_type,
        })
    }
}

/// One response header. Values are kept as raw bytes since they need not be ASCII.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredHeader {
    pub name: String,
    #[serde(with = "bytes_base64")]
    pub value: Vec<u8>,
}

fn basic_type() -> String {
    ResponseType::Basic.as_str().to_string()
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

mod bytes_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
