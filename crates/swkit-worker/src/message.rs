//! Messages posted to the worker by its pages.
//!
//! ```json
//! {"type": "CACHE_URLS", "payload": {"urlsToCache": ["/a.js", ["/b.js", {"mode": "no-cors"}]]}}
//! {"type": "SKIP_WAITING"}
//! ```
//!
//! Other message types are ignored.

use serde::Deserialize;
use swkit_net::{CacheMode, Request, RequestMode};
use url::Url;

use crate::error::ServiceWorkerError;

/// A recognized worker message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMessage {
    /// Route each listed URL so matching routes can cache it.
    CacheUrls(Vec<UrlToCache>),
    /// Activate without waiting for old clients to close.
    SkipWaiting,
    /// Any other message type.
    Unknown(String),
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheUrlsPayload {
    urls_to_cache: Vec<UrlToCache>,
}

/// One `urlsToCache` element: a URL, or a URL with request options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UrlToCache {
    Url(String),
    WithInit(String, RequestInit),
}

/// The subset of request options honored for cached URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RequestInit {
    pub mode: Option<String>,
    pub cache: Option<String>,
    pub integrity: Option<String>,
}

impl WorkerMessage {
    pub fn from_json(data: &serde_json::Value) -> Result<Self, ServiceWorkerError> {
        let raw = RawMessage::deserialize(data)
            .map_err(|e| ServiceWorkerError::InvalidMessage(e.to_string()))?;

        match raw.kind.as_str() {
            "CACHE_URLS" => {
                let payload = CacheUrlsPayload::deserialize(raw.payload)
                    .map_err(|e| ServiceWorkerError::InvalidMessage(e.to_string()))?;
                Ok(WorkerMessage::CacheUrls(payload.urls_to_cache))
            }
            "SKIP_WAITING" => Ok(WorkerMessage::SkipWaiting),
            _ => Ok(WorkerMessage::Unknown(raw.kind)),
        }
    }
}

impl UrlToCache {
    pub fn url(&self) -> &str {
        match self {
            UrlToCache::Url(url) | UrlToCache::WithInit(url, _) => url,
        }
    }

    /// Build the GET request for this entry, resolving relative URLs
    /// against `base`.
    pub fn to_request(&self, base: &Url) -> Result<Request, ServiceWorkerError> {
        let url = base
            .join(self.url())
            .map_err(|e| ServiceWorkerError::InvalidUrl {
                url: self.url().to_string(),
                message: e.to_string(),
            })?;
        let mut request = Request::get(url);

        let UrlToCache::WithInit(_, init) = self else {
            return Ok(request);
        };
        if let Some(ref mode) = init.mode {
            request = request.mode(parse_mode(mode)?);
        }
        if let Some(ref cache) = init.cache {
            request = request.cache_mode(parse_cache_mode(cache)?);
        }
        request.integrity = init.integrity.clone();
        Ok(request)
    }
}

fn parse_mode(mode: &str) -> Result<RequestMode, ServiceWorkerError> {
    match mode {
        "navigate" => Ok(RequestMode::Navigate),
        "same-origin" => Ok(RequestMode::SameOrigin),
        "no-cors" => Ok(RequestMode::NoCors),
        "cors" => Ok(RequestMode::Cors),
        other => Err(ServiceWorkerError::InvalidMessage(format!(
            "unknown request mode {other:?}"
        ))),
    }
}

fn parse_cache_mode(cache: &str) -> Result<CacheMode, ServiceWorkerError> {
    [
        CacheMode::Default,
        CacheMode::NoStore,
        CacheMode::Reload,
        CacheMode::NoCache,
        CacheMode::ForceCache,
        CacheMode::OnlyIfCached,
    ]
    .into_iter()
    .find(|mode| mode.as_str() == cache)
    .ok_or_else(|| ServiceWorkerError::InvalidMessage(format!("unknown cache mode {cache:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_urls() {
        let message = WorkerMessage::from_json(&json!({
            "type": "CACHE_URLS",
            "payload": {"urlsToCache": ["/a.js", ["/b.js", {"mode": "no-cors", "cache": "reload"}]]}
        }))
        .unwrap();

        let WorkerMessage::CacheUrls(urls) = message else {
            panic!("expected CACHE_URLS");
        };
        assert_eq!(urls.len(), 2);

        let base = Url::parse("https://example.com/sw.js").unwrap();
        let first = urls[0].to_request(&base).unwrap();
        assert_eq!(first.url.as_str(), "https://example.com/a.js");

        let second = urls[1].to_request(&base).unwrap();
        assert_eq!(second.mode, RequestMode::NoCors);
        assert_eq!(second.cache_mode, CacheMode::Reload);
    }

    #[test]
    fn test_other_types() {
        assert_eq!(
            WorkerMessage::from_json(&json!({"type": "SKIP_WAITING"})).unwrap(),
            WorkerMessage::SkipWaiting
        );
        assert_eq!(
            WorkerMessage::from_json(&json!({"type": "PING", "payload": 1})).unwrap(),
            WorkerMessage::Unknown("PING".to_string())
        );
    }

    #[test]
    fn test_malformed() {
        let err = WorkerMessage::from_json(&json!({"payload": {}})).unwrap_err();
        assert_eq!(err.kind(), "invalid-message");

        let err =
            WorkerMessage::from_json(&json!({"type": "CACHE_URLS", "payload": {}})).unwrap_err();
        assert_eq!(err.kind(), "invalid-message");

        let bad_mode = UrlToCache::WithInit(
            "/a.js".to_string(),
            RequestInit {
                mode: Some("sideways".to_string()),
                ..Default::default()
            },
        );
        let base = Url::parse("https://example.com/").unwrap();
        assert!(bad_mode.to_request(&base).is_err());
    }
}
