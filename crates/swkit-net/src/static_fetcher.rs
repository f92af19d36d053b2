//! In-memory fetcher.
//!
//! Serves canned responses keyed by absolute URL. Hosts use it to back a
//! worker with assets embedded in the binary; tests use it as the network.

use async_trait::async_trait;
use hashbrown::HashMap;
use http::StatusCode;
use tokio::sync::RwLock;
use tracing::trace;
use url::Url;

use crate::{integrity, Fetcher, NetError, Request, Response};

enum Route {
    Respond(Response),
    Fail(String),
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Route>,
    log: Vec<Request>,
}

/// Fetcher that answers from a fixed table.
///
/// Unknown URLs get a 404. Integrity metadata on requests is enforced the
/// same way [`crate::HttpFetcher`] does.
#[derive(Default)]
pub struct StaticFetcher {
    state: RwLock<State>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 at `url`.
    pub async fn insert(&self, url: &Url, body: impl Into<bytes::Bytes>) {
        self.insert_response(Response::new(url.clone(), StatusCode::OK, body))
            .await;
    }

    /// Serve a prepared response at its own URL.
    pub async fn insert_response(&self, response: Response) {
        let key = response.url.to_string();
        self.insert_response_at(&key, response).await;
    }

    /// Serve a prepared response at `url`, e.g. a redirected response whose
    /// final URL differs from the requested one.
    pub async fn insert_response_at(&self, url: &str, response: Response) {
        self.state
            .write()
            .await
            .routes
            .insert(url.to_string(), Route::Respond(response));
    }

    /// Make requests for `url` fail as if the network was down.
    pub async fn fail(&self, url: &Url, reason: &str) {
        self.state
            .write()
            .await
            .routes
            .insert(url.to_string(), Route::Fail(reason.to_string()));
    }

    /// Stop serving `url`.
    pub async fn remove(&self, url: &Url) {
        self.state.write().await.routes.remove(url.as_str());
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<Request> {
        self.state.read().await.log.clone()
    }

    /// Number of requests received for `url`.
    pub async fn calls(&self, url: &str) -> usize {
        self.state
            .read()
            .await
            .log
            .iter()
            .filter(|r| r.url.as_str() == url)
            .count()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: Request) -> Result<Response, NetError> {
        let mut state = self.state.write().await;
        state.log.push(request.clone());
        trace!(url = %request.url, "Static fetch");

        let response = match state.routes.get(request.url.as_str()) {
            Some(Route::Respond(response)) => response.clone(),
            Some(Route::Fail(reason)) => return Err(NetError::RequestFailed(reason.clone())),
            None => Response::new(request.url.clone(), StatusCode::NOT_FOUND, ""),
        };

        if let Some(ref metadata) = request.integrity {
            if request.integrity_checkable() && !integrity::verify(metadata, &response.body) {
                return Err(NetError::IntegrityMismatch {
                    url: request.url,
                    expected: metadata.clone(),
                });
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrity::Algorithm;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_serves_inserted_body() {
        let fetcher = StaticFetcher::new();
        fetcher.insert(&url("https://example.com/a.css"), "a{}").await;

        let response = fetcher
            .fetch(Request::get(url("https://example.com/a.css")))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"a{}");
        assert_eq!(fetcher.calls("https://example.com/a.css").await, 1);
    }

    #[tokio::test]
    async fn test_unknown_url_is_404() {
        let fetcher = StaticFetcher::new();
        let response = fetcher
            .fetch(Request::get(url("https://example.com/missing")))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failure() {
        let fetcher = StaticFetcher::new();
        fetcher.fail(&url("https://example.com/x"), "offline").await;
        let err = fetcher
            .fetch(Request::get(url("https://example.com/x")))
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_integrity_enforced() {
        let fetcher = StaticFetcher::new();
        fetcher.insert(&url("https://example.com/x.js"), "x").await;

        let bad = integrity::compute(Algorithm::Sha256, b"y");
        let err = fetcher
            .fetch(Request::get(url("https://example.com/x.js")).integrity(bad))
            .await
            .unwrap_err();
        assert!(matches!(err, NetError::IntegrityMismatch { .. }));
    }
}
