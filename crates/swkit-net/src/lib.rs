//! # SwKit Net
//!
//! Request/response model and network access for the SwKit service-worker
//! runtime.
//!
//! ## Design Goals
//!
//! 1. **Fetch semantics**: requests carry the fetch options a worker cares
//!    about (cache mode, request mode, integrity)
//! 2. **Owned bodies**: responses hold their body as `Bytes`, so copying or
//!    re-storing a response never consumes it
//! 3. **Pluggable network**: everything above this crate talks to a
//!    [`Fetcher`], never to an HTTP client directly

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use mime::Mime;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use url::Url;

pub mod integrity;
pub mod static_fetcher;

pub use static_fetcher::StaticFetcher;

/// Errors that can occur in networking.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Integrity check failed for {url} (expected {expected})")]
    IntegrityMismatch { url: Url, expected: String },

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Cache mode of a request, as understood by the HTTP cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    NoStore,
    /// Bypass any HTTP cache and revalidate with the origin.
    Reload,
    NoCache,
    ForceCache,
    OnlyIfCached,
}

impl CacheMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Default => "default",
            CacheMode::NoStore => "no-store",
            CacheMode::Reload => "reload",
            CacheMode::NoCache => "no-cache",
            CacheMode::ForceCache => "force-cache",
            CacheMode::OnlyIfCached => "only-if-cached",
        }
    }
}

/// Request mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level or frame navigation.
    Navigate,
    SameOrigin,
    /// Opaque cross-origin request; integrity cannot be checked.
    NoCors,
    #[default]
    Cors,
}

/// Credentials mode for requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialsMode {
    /// Never send cookies.
    Omit,
    /// Send cookies only for same-origin requests.
    #[default]
    SameOrigin,
    /// Always send cookies.
    Include,
}

/// A fetch request.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    /// Subresource integrity metadata the response must satisfy.
    pub integrity: Option<String>,
    pub cache_mode: CacheMode,
    pub mode: RequestMode,
    pub credentials: CredentialsMode,
}

impl Request {
    /// Create a GET request.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: HeaderMap::new(),
            integrity: None,
            cache_mode: CacheMode::Default,
            mode: RequestMode::Cors,
            credentials: CredentialsMode::SameOrigin,
        }
    }

    /// Create a navigation request.
    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            credentials: CredentialsMode::Include,
            ..Self::get(url)
        }
    }

    /// Parse a URL and create a GET request for it.
    pub fn parse(url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|e| NetError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::get(url))
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set integrity metadata.
    pub fn integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = Some(integrity.into());
        self
    }

    /// Set the cache mode.
    pub fn cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    /// Set the request mode.
    pub fn mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the credentials mode.
    pub fn credentials(mut self, credentials: CredentialsMode) -> Self {
        self.credentials = credentials;
        self
    }

    /// Same request, different URL. Headers are kept.
    pub fn with_url(&self, url: Url) -> Self {
        Self {
            url,
            ..self.clone()
        }
    }

    /// Whether the integrity of a response to this request can be checked.
    pub fn integrity_checkable(&self) -> bool {
        self.mode != RequestMode::NoCors
    }
}

/// Response type, as exposed to worker code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Basic,
    Cors,
    Default,
    Opaque,
    OpaqueRedirect,
    Error,
}

impl ResponseType {
    const ALL: [ResponseType; 6] = [
        ResponseType::Basic,
        ResponseType::Cors,
        ResponseType::Default,
        ResponseType::Opaque,
        ResponseType::OpaqueRedirect,
        ResponseType::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Default => "default",
            ResponseType::Opaque => "opaque",
            ResponseType::OpaqueRedirect => "opaqueredirect",
            ResponseType::Error => "error",
        }
    }

    /// Inverse of [`ResponseType::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == name)
    }
}

/// A response with a fully loaded body.
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL, after redirects.
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Whether the response is the result of following a redirect.
    pub redirected: bool,
    pub response_type: ResponseType,
}

impl Response {
    /// Create a basic response.
    pub fn new(url: Url, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            url,
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            redirected: false,
            response_type: ResponseType::Basic,
        }
    }

    /// Add a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Check if the status is in the 2xx range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Parsed `Content-Type`.
    pub fn content_type(&self) -> Option<Mime> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<Mime>().ok())
    }

    /// Copy of this response with the redirect flag cleared.
    ///
    /// Navigations cannot be answered with a redirected response, so
    /// precached responses are always stored as a fresh copy. Status,
    /// headers and body are preserved.
    pub fn copy_without_redirect(&self) -> Self {
        Self {
            redirected: false,
            ..self.clone()
        }
    }
}

/// Something that can perform network fetches.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: Request) -> Result<Response, NetError>;
}

/// HTTP fetcher configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// User agent string.
    pub user_agent: String,
    /// Default timeout.
    pub default_timeout: Duration,
    /// Maximum redirects.
    pub max_redirects: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("SwKit/{}", env!("CARGO_PKG_VERSION")),
            default_timeout: Duration::from_secs(30),
            max_redirects: 10,
        }
    }
}

/// Fetcher backed by a reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher.
    pub fn new(config: LoaderConfig) -> Result<Self, NetError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.default_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| NetError::RequestFailed(e.to_string()))?;

        info!("HttpFetcher initialized");

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: Request) -> Result<Response, NetError> {
        debug!(
            url = %request.url,
            method = %request.method,
            cache_mode = request.cache_mode.as_str(),
            "Fetching resource"
        );

        let mut req_builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in request.headers.iter() {
            req_builder = req_builder.header(name, value);
        }

        // There is no HTTP cache below us; ask intermediaries to revalidate.
        match request.cache_mode {
            CacheMode::Reload | CacheMode::NoCache => {
                req_builder = req_builder
                    .header(header::CACHE_CONTROL, "no-cache")
                    .header(header::PRAGMA, "no-cache");
            }
            CacheMode::NoStore => {
                req_builder = req_builder.header(header::CACHE_CONTROL, "no-store");
            }
            _ => {}
        }

        let response = req_builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let redirected = url != request.url;
        let body = response.bytes().await?;

        trace!(
            url = %url,
            status = %status,
            redirected,
            body_len = body.len(),
            "Response received"
        );

        if let Some(ref metadata) = request.integrity {
            if request.integrity_checkable() && !integrity::verify(metadata, &body) {
                warn!(url = %request.url, "Integrity check failed");
                return Err(NetError::IntegrityMismatch {
                    url: request.url,
                    expected: metadata.clone(),
                });
            }
        }

        Ok(Response {
            url,
            status,
            headers,
            body,
            redirected,
            response_type: ResponseType::Basic,
        })
    }
}
