//! Precache controller.
//!
//! Owns the manifest registry and the strategy that serves it, and drives
//! the two lifecycle phases:
//!
//! - **install** fetches every registered entry, one at a time and in
//!   registration order, and stores it under its cache key. Any failure
//!   fails the whole install.
//! - **activate** deletes every stored key the current manifest no longer
//!   expects.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use hashbrown::HashSet;
use indexmap::IndexMap;
use swkit_cache::{CacheNames, CacheStorage, QuotaErrorCallbacks};
use swkit_net::{CacheMode, CredentialsMode, Fetcher, Request, Response};
use tracing::{debug, info};
use url::Url;

use crate::cache_key::resolve_url;
use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::ManifestEntry;
use crate::plugin::{CacheKeyMode, CacheKeyWillBeUsed, EventKind, HandlerContext, Plugin};
use crate::registry::{ManifestRegistry, RegisterReport};
use crate::strategy::{HandleOutcome, PrecacheStrategy, PrecacheStrategyOptions, ResponseSource};

/// What the controller needs from the worker's host environment.
#[derive(Clone)]
pub struct PrecacheHost {
    /// The worker script's own URL; relative manifest URLs resolve against it.
    pub location: Url,
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub cache_names: CacheNames,
    pub quota_callbacks: QuotaErrorCallbacks,
}

impl std::fmt::Debug for PrecacheHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecacheHost")
            .field("location", &self.location.as_str())
            .field("cache_names", &self.cache_names)
            .finish_non_exhaustive()
    }
}

/// Controller options.
#[derive(Debug, Clone)]
pub struct PrecacheControllerOptions {
    /// Full precache name; defaults to the generated precache name.
    pub cache_name: Option<String>,
    /// Extra hooks run by the strategy.
    pub plugins: Vec<Plugin>,
    /// Fetch from the network when a precached entry is missing at runtime.
    pub fallback_to_network: bool,
}

impl Default for PrecacheControllerOptions {
    fn default() -> Self {
        Self {
            cache_name: None,
            plugins: Vec::new(),
            fallback_to_network: true,
        }
    }
}

/// URLs written vs. already present after an install, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallResult {
    pub updated_urls: Vec<String>,
    pub not_updated_urls: Vec<String>,
}

/// Stored keys removed by an activate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupResult {
    pub deleted_urls: Vec<String>,
}

type SharedRegistry = Arc<RwLock<ManifestRegistry>>;

fn read(registry: &SharedRegistry) -> RwLockReadGuard<'_, ManifestRegistry> {
    registry.read().unwrap_or_else(PoisonError::into_inner)
}

/// Rewrites strategy cache reads and writes to the registry's cache key.
///
/// An explicit key in the handler context wins; otherwise the request URL is
/// looked up in the registry. Unknown URLs pass through unchanged.
pub struct PrecacheCacheKeyPlugin {
    registry: SharedRegistry,
}

#[async_trait]
impl CacheKeyWillBeUsed for PrecacheCacheKeyPlugin {
    async fn cache_key_will_be_used(
        &self,
        request: Request,
        _mode: CacheKeyMode,
        ctx: &HandlerContext,
    ) -> Request {
        let cache_key = match ctx.cache_key {
            Some(ref key) => Some(key.clone()),
            None => read(&self.registry)
                .lookup_cache_key(request.url.as_str())
                .map(str::to_string),
        };

        match cache_key.map(|key| Url::parse(&key)) {
            Some(Ok(url)) => request.with_url(url),
            _ => request,
        }
    }
}

/// Registry, strategy and lifecycle for one precache.
pub struct PrecacheController {
    registry: SharedRegistry,
    strategy: Arc<PrecacheStrategy>,
    storage: Arc<dyn CacheStorage>,
}

impl PrecacheController {
    pub fn new(host: PrecacheHost, options: PrecacheControllerOptions) -> Self {
        let registry = Arc::new(RwLock::new(ManifestRegistry::new(host.location.clone())));
        let cache_name = host
            .cache_names
            .precache_name(options.cache_name.as_deref());

        let mut plugins = options.plugins;
        plugins.push(Plugin::CacheKeyWillBeUsed(Arc::new(PrecacheCacheKeyPlugin {
            registry: registry.clone(),
        })));

        let strategy = PrecacheStrategy::new(
            host.storage.clone(),
            host.fetcher,
            host.quota_callbacks,
            PrecacheStrategyOptions {
                cache_name,
                plugins,
                fallback_to_network: options.fallback_to_network,
            },
        );

        Self {
            registry,
            strategy: Arc::new(strategy),
            storage: host.storage,
        }
    }

    pub fn cache_name(&self) -> &str {
        self.strategy.cache_name()
    }

    pub fn strategy(&self) -> &Arc<PrecacheStrategy> {
        &self.strategy
    }

    /// Merge manifest entries into the registry. Safe to call repeatedly
    /// with overlapping entries.
    pub fn add_to_cache_list(&self, entries: &[ManifestEntry]) -> PrecacheResult<RegisterReport> {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(entries)
    }

    /// Populate the precache with every registered entry.
    pub async fn install(&self) -> PrecacheResult<InstallResult> {
        let pending: Vec<(String, String, Option<String>, CacheMode)> = {
            let registry = read(&self.registry);
            registry
                .urls_to_cache_keys()
                .iter()
                .map(|(url, cache_key)| {
                    (
                        url.clone(),
                        cache_key.clone(),
                        registry.lookup_integrity(cache_key).map(str::to_string),
                        registry.cache_mode(url),
                    )
                })
                .collect()
        };

        let mut result = InstallResult::default();
        for (url, cache_key, integrity, cache_mode) in pending {
            let parsed = Url::parse(&url).map_err(|e| PrecacheError::invalid_url(&url, e))?;
            let mut request = Request::get(parsed)
                .cache_mode(cache_mode)
                .credentials(CredentialsMode::SameOrigin);
            request.integrity = integrity.clone();

            let ctx = HandlerContext::new(EventKind::Install)
                .with_cache_key(cache_key)
                .with_integrity(integrity);
            let outcome = self.strategy.handle(request, &ctx).await?;

            if outcome.source == ResponseSource::Cache {
                debug!(url = %url, "Precache entry up to date");
                result.not_updated_urls.push(url);
            } else {
                debug!(url = %url, "Precached");
                result.updated_urls.push(url);
            }
        }

        info!(
            cache = %self.cache_name(),
            updated = result.updated_urls.len(),
            up_to_date = result.not_updated_urls.len(),
            "Precache install complete"
        );
        Ok(result)
    }

    /// Delete stored entries the registry no longer expects.
    pub async fn activate(&self) -> PrecacheResult<CleanupResult> {
        let cache_name = self.cache_name();
        self.storage.open(cache_name).await?;

        let expected: HashSet<String> = read(&self.registry)
            .expected_cache_keys()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut result = CleanupResult::default();
        for key in self.storage.keys(cache_name).await? {
            if expected.contains(&key) {
                continue;
            }
            self.storage.delete(cache_name, &key).await?;
            debug!(cache = %cache_name, url = %key, "Deleted outdated precache entry");
            result.deleted_urls.push(key);
        }

        info!(
            cache = %cache_name,
            deleted = result.deleted_urls.len(),
            "Precache cleanup complete"
        );
        Ok(result)
    }

    /// Cache key for a registered URL. Relative URLs resolve against the
    /// worker location.
    pub fn get_cache_key_for_url(&self, url: &str) -> Option<String> {
        read(&self.registry)
            .lookup_cache_key(url)
            .map(str::to_string)
    }

    /// URL → cache key, in registration order.
    pub fn get_urls_to_cache_keys(&self) -> IndexMap<String, String> {
        read(&self.registry).urls_to_cache_keys().clone()
    }

    pub fn get_cached_urls(&self) -> Vec<String> {
        read(&self.registry).cached_urls()
    }

    pub fn get_integrity_for_cache_key(&self, cache_key: &str) -> Option<String> {
        read(&self.registry)
            .lookup_integrity(cache_key)
            .map(str::to_string)
    }

    /// Read a precached response directly, without running any hooks.
    /// `None` if the URL is not registered or its entry is missing.
    pub async fn match_precache(&self, url: &str) -> PrecacheResult<Option<Response>> {
        let Some(cache_key) = self.get_cache_key_for_url(url) else {
            return Ok(None);
        };
        Ok(self
            .storage
            .match_request(self.cache_name(), &cache_key)
            .await?)
    }

    pub async fn match_precache_request(
        &self,
        request: &Request,
    ) -> PrecacheResult<Option<Response>> {
        self.match_precache(request.url.as_str()).await
    }

    /// A handler that always serves the entry registered for `url`,
    /// whatever request it is invoked for.
    pub fn create_handler_bound_to_url(&self, url: &str) -> PrecacheResult<BoundHandler> {
        let base = read(&self.registry).base().clone();
        let resolved = resolve_url(url, &base)?;
        let Some(cache_key) = self.get_cache_key_for_url(resolved.as_str()) else {
            return Err(PrecacheError::NonPrecachedUrl {
                url: resolved.to_string(),
            });
        };

        Ok(BoundHandler {
            strategy: self.strategy.clone(),
            url: resolved,
            cache_key,
        })
    }
}

impl std::fmt::Debug for PrecacheController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecacheController")
            .field("cache_name", &self.cache_name())
            .field("entries", &read(&self.registry).len())
            .finish()
    }
}

/// Serves one fixed precache entry. See
/// [`PrecacheController::create_handler_bound_to_url`].
#[derive(Clone)]
pub struct BoundHandler {
    strategy: Arc<PrecacheStrategy>,
    url: Url,
    cache_key: String,
}

impl BoundHandler {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub async fn handle(&self, event: EventKind) -> PrecacheResult<HandleOutcome> {
        let ctx = HandlerContext::new(event).with_cache_key(self.cache_key.clone());
        self.strategy
            .handle(Request::get(self.url.clone()), &ctx)
            .await
    }
}

impl std::fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundHandler")
            .field("url", &self.url.as_str())
            .field("cache_key", &self.cache_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use swkit_cache::MemoryCacheStorage;
    use swkit_net::integrity::{self, Algorithm};
    use swkit_net::StaticFetcher;

    const ORIGIN: &str = "https://example.com";

    struct Fixture {
        storage: Arc<MemoryCacheStorage>,
        fetcher: Arc<StaticFetcher>,
        controller: PrecacheController,
    }

    fn location() -> Url {
        Url::parse("https://example.com/sw.js").unwrap()
    }

    fn abs(path: &str) -> String {
        format!("{ORIGIN}{path}")
    }

    fn fixture(options: PrecacheControllerOptions) -> Fixture {
        let storage = Arc::new(MemoryCacheStorage::new());
        fixture_with(storage, options)
    }

    fn fixture_with(
        storage: Arc<MemoryCacheStorage>,
        options: PrecacheControllerOptions,
    ) -> Fixture {
        let fetcher = Arc::new(StaticFetcher::new());
        let scope = Url::parse("https://example.com/").unwrap();
        let host = PrecacheHost {
            location: location(),
            storage: storage.clone(),
            fetcher: fetcher.clone(),
            cache_names: CacheNames::new(&scope),
            quota_callbacks: QuotaErrorCallbacks::new(),
        };
        Fixture {
            storage,
            fetcher,
            controller: PrecacheController::new(host, options),
        }
    }

    async fn serve(fetcher: &StaticFetcher, path: &str, body: &'static str) {
        fetcher.insert(&Url::parse(&abs(path)).unwrap(), body).await;
    }

    fn manifest() -> Vec<ManifestEntry> {
        vec![
            ManifestEntry::revisioned("/index.html", "r1"),
            ManifestEntry::from("/app.9f8e.js"),
        ]
    }

    #[test]
    fn test_default_cache_name() {
        let f = fixture(PrecacheControllerOptions::default());
        assert_eq!(f.controller.cache_name(), "workbox-precache-v2-https://example.com/");
    }

    #[test]
    fn test_cache_name_override() {
        let f = fixture(PrecacheControllerOptions {
            cache_name: Some("docs".to_string()),
            ..Default::default()
        });
        assert_eq!(f.controller.cache_name(), "docs");
    }

    #[tokio::test]
    async fn test_install_stores_every_cache_key() {
        let f = fixture(PrecacheControllerOptions::default());
        serve(&f.fetcher, "/index.html", "<html>").await;
        serve(&f.fetcher, "/app.9f8e.js", "js").await;
        f.controller.add_to_cache_list(&manifest()).unwrap();

        let result = f.controller.install().await.unwrap();
        assert_eq!(result.updated_urls, vec![abs("/index.html"), abs("/app.9f8e.js")]);
        assert!(result.not_updated_urls.is_empty());

        let keys = f.storage.keys(f.controller.cache_name()).await.unwrap();
        assert_eq!(
            keys,
            vec![abs("/index.html?__WB_REVISION__=r1"), abs("/app.9f8e.js")]
        );
    }

    #[tokio::test]
    async fn test_install_requests_in_order_with_hints() {
        let f = fixture(PrecacheControllerOptions::default());
        serve(&f.fetcher, "/index.html", "<html>").await;
        serve(&f.fetcher, "/app.9f8e.js", "js").await;
        let sri = integrity::compute(Algorithm::Sha256, b"js");
        f.controller
            .add_to_cache_list(&[
                ManifestEntry::revisioned("/index.html", "r1"),
                ManifestEntry::from("/app.9f8e.js").with_integrity(sri.clone()),
            ])
            .unwrap();

        f.controller.install().await.unwrap();

        let sent = f.fetcher.requests().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].url.as_str(), abs("/index.html"));
        assert_eq!(sent[0].cache_mode, CacheMode::Reload);
        assert_eq!(sent[0].credentials, CredentialsMode::SameOrigin);
        assert_eq!(sent[1].cache_mode, CacheMode::Default);
        assert_eq!(sent[1].integrity.as_deref(), Some(sri.as_str()));
    }

    #[tokio::test]
    async fn test_second_install_is_not_updated() {
        let f = fixture(PrecacheControllerOptions::default());
        serve(&f.fetcher, "/index.html", "<html>").await;
        serve(&f.fetcher, "/app.9f8e.js", "js").await;
        f.controller.add_to_cache_list(&manifest()).unwrap();

        f.controller.install().await.unwrap();
        let again = f.controller.install().await.unwrap();

        assert!(again.updated_urls.is_empty());
        assert_eq!(again.not_updated_urls.len(), 2);
        assert_eq!(f.fetcher.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_install_fails_on_bad_response() {
        let f = fixture(PrecacheControllerOptions::default());
        serve(&f.fetcher, "/index.html", "<html>").await;
        f.controller.add_to_cache_list(&manifest()).unwrap();

        let err = f.controller.install().await.unwrap_err();
        assert_eq!(err.kind(), "bad-precaching-response");
        assert!(err.is_fatal_to_install());
    }

    #[tokio::test]
    async fn test_activate_deletes_unexpected_keys() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let old = fixture_with(storage.clone(), PrecacheControllerOptions::default());
        serve(&old.fetcher, "/index.html", "v1").await;
        serve(&old.fetcher, "/app.9f8e.js", "js").await;
        serve(&old.fetcher, "/gone.css", "css").await;
        old.controller.add_to_cache_list(&manifest()).unwrap();
        old.controller
            .add_to_cache_list(&[ManifestEntry::from("/gone.css")])
            .unwrap();
        old.controller.install().await.unwrap();
        assert!(old.controller.activate().await.unwrap().deleted_urls.is_empty());

        let new = fixture_with(storage, PrecacheControllerOptions::default());
        serve(&new.fetcher, "/index.html", "v2").await;
        new.controller
            .add_to_cache_list(&[
                ManifestEntry::revisioned("/index.html", "r2"),
                ManifestEntry::from("/app.9f8e.js"),
            ])
            .unwrap();
        let installed = new.controller.install().await.unwrap();
        assert_eq!(installed.updated_urls, vec![abs("/index.html")]);
        assert_eq!(installed.not_updated_urls, vec![abs("/app.9f8e.js")]);

        let cleanup = new.controller.activate().await.unwrap();
        assert_eq!(
            cleanup.deleted_urls,
            vec![abs("/index.html?__WB_REVISION__=r1"), abs("/gone.css")]
        );
        let keys = new.storage.keys(new.controller.cache_name()).await.unwrap();
        assert_eq!(
            keys,
            vec![abs("/app.9f8e.js"), abs("/index.html?__WB_REVISION__=r2")]
        );
    }

    #[tokio::test]
    async fn test_lookups() {
        let f = fixture(PrecacheControllerOptions::default());
        let sri = integrity::compute(Algorithm::Sha256, b"js");
        f.controller
            .add_to_cache_list(&[
                ManifestEntry::revisioned("/index.html", "r1"),
                ManifestEntry::from("/app.9f8e.js").with_integrity(sri.clone()),
            ])
            .unwrap();

        assert_eq!(
            f.controller.get_cache_key_for_url("index.html").as_deref(),
            Some(abs("/index.html?__WB_REVISION__=r1").as_str())
        );
        assert_eq!(f.controller.get_cache_key_for_url("/missing"), None);
        assert_eq!(
            f.controller.get_cached_urls(),
            vec![abs("/index.html"), abs("/app.9f8e.js")]
        );
        assert_eq!(f.controller.get_urls_to_cache_keys().len(), 2);
        assert_eq!(
            f.controller
                .get_integrity_for_cache_key(&abs("/app.9f8e.js"))
                .as_deref(),
            Some(sri.as_str())
        );
    }

    #[tokio::test]
    async fn test_match_precache() {
        let f = fixture(PrecacheControllerOptions::default());
        serve(&f.fetcher, "/index.html", "<html>").await;
        serve(&f.fetcher, "/app.9f8e.js", "js").await;
        f.controller.add_to_cache_list(&manifest()).unwrap();

        assert!(f.controller.match_precache("/index.html").await.unwrap().is_none());

        f.controller.install().await.unwrap();
        let response = f
            .controller
            .match_precache("/index.html")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&response.body[..], b"<html>");

        let request = Request::parse(&abs("/app.9f8e.js")).unwrap();
        assert!(f
            .controller
            .match_precache_request(&request)
            .await
            .unwrap()
            .is_some());
        assert!(f.controller.match_precache("/other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bound_handler_serves_fixed_entry() {
        let f = fixture(PrecacheControllerOptions::default());
        serve(&f.fetcher, "/index.html", "<html>").await;
        serve(&f.fetcher, "/app.9f8e.js", "js").await;
        f.controller.add_to_cache_list(&manifest()).unwrap();
        f.controller.install().await.unwrap();

        let handler = f.controller.create_handler_bound_to_url("/index.html").unwrap();
        assert_eq!(handler.cache_key(), abs("/index.html?__WB_REVISION__=r1"));

        let outcome = handler.handle(EventKind::Fetch).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(&outcome.response.body[..], b"<html>");
    }

    #[test]
    fn test_bound_handler_requires_registered_url() {
        let f = fixture(PrecacheControllerOptions::default());
        f.controller.add_to_cache_list(&manifest()).unwrap();

        let err = f.controller.create_handler_bound_to_url("/nope.html").unwrap_err();
        assert!(matches!(
            err,
            PrecacheError::NonPrecachedUrl { ref url } if url == "https://example.com/nope.html"
        ));
    }

    #[tokio::test]
    async fn test_runtime_miss_repairs_through_key_plugin() {
        let f = fixture(PrecacheControllerOptions::default());
        serve(&f.fetcher, "/app.9f8e.js", "js").await;
        let sri = integrity::compute(Algorithm::Sha256, b"js");
        f.controller
            .add_to_cache_list(&[ManifestEntry::from("/app.9f8e.js").with_integrity(sri.clone())])
            .unwrap();

        let ctx = HandlerContext::new(EventKind::Fetch).with_integrity(Some(sri));
        let request = Request::parse(&abs("/app.9f8e.js")).unwrap();
        let outcome = f.controller.strategy().handle(request, &ctx).await.unwrap();

        assert_eq!(outcome.source, ResponseSource::Network { repaired: true });
        assert!(f.controller.match_precache("/app.9f8e.js").await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_repair_one_entry() {
        let f = fixture(PrecacheControllerOptions::default());
        serve(&f.fetcher, "/app.9f8e.js", "js").await;
        let sri = integrity::compute(Algorithm::Sha256, b"js");
        f.controller
            .add_to_cache_list(&[ManifestEntry::from("/app.9f8e.js").with_integrity(sri.clone())])
            .unwrap();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let strategy = f.controller.strategy().clone();
                let sri = sri.clone();
                tokio::spawn(async move {
                    let ctx = HandlerContext::new(EventKind::Fetch).with_integrity(Some(sri));
                    let request = Request::parse(&abs("/app.9f8e.js")).unwrap();
                    strategy.handle(request, &ctx).await
                })
            })
            .collect();

        let mut repaired = 0;
        for task in tasks {
            let outcome = task.await.unwrap().unwrap();
            assert_eq!(&outcome.response.body[..], b"js");
            match outcome.source {
                ResponseSource::Cache => {}
                ResponseSource::Network { repaired: true } => repaired += 1,
                other => panic!("unexpected source {other:?}"),
            }
        }
        assert!(repaired >= 1);
        assert!(f.fetcher.calls(&abs("/app.9f8e.js")).await >= 1);

        assert_eq!(
            f.storage.keys(f.controller.cache_name()).await.unwrap(),
            vec![abs("/app.9f8e.js")]
        );
        let cached = f.controller.match_precache("/app.9f8e.js").await.unwrap().unwrap();
        assert_eq!(&cached.body[..], b"js");
    }

    #[tokio::test]
    async fn test_fallback_disabled_reports_missing_entry() {
        let f = fixture(PrecacheControllerOptions {
            fallback_to_network: false,
            ..Default::default()
        });
        serve(&f.fetcher, "/app.9f8e.js", "js").await;
        f.controller
            .add_to_cache_list(&[ManifestEntry::from("/app.9f8e.js")])
            .unwrap();

        let handler = f.controller.create_handler_bound_to_url("/app.9f8e.js").unwrap();
        let err = handler.handle(EventKind::Fetch).await.unwrap_err();
        assert_eq!(err.kind(), "missing-precache-entry");
        assert!(f.fetcher.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_runtime_fetch_without_integrity_is_not_stored() {
        let f = fixture(PrecacheControllerOptions::default());
        f.fetcher
            .insert_response(Response::new(
                Url::parse(&abs("/app.9f8e.js")).unwrap(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "",
            ))
            .await;
        f.controller
            .add_to_cache_list(&[ManifestEntry::from("/app.9f8e.js")])
            .unwrap();

        let handler = f.controller.create_handler_bound_to_url("/app.9f8e.js").unwrap();
        let outcome = handler.handle(EventKind::Fetch).await.unwrap();
        assert_eq!(outcome.response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(outcome.source, ResponseSource::Network { repaired: false });
    }
}
