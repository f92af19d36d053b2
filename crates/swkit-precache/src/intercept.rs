//! Precache request interception.
//!
//! A request is matched against the registry by trying URL variations in a
//! fixed order; the first one with a cache key wins:
//!
//! 1. the URL without its fragment
//! 2. the same, without ignored query parameters
//! 3. a directory index appended to a path ending in `/`
//! 4. `.html` appended to the path
//! 5. caller-supplied variations
//!
//! A request that matches no variation is declined, not failed.

use std::sync::Arc;

use http::Method;
use regex::Regex;
use swkit_common::{ConfigError, RoutingSettings};
use swkit_net::Request;
use tracing::{debug, trace};
use url::Url;

use crate::controller::PrecacheController;
use crate::error::PrecacheResult;
use crate::plugin::{EventKind, HandlerContext};
use crate::strategy::HandleOutcome;

/// Extra URL variations to try after the built-in ones.
pub type UrlManipulation = Arc<dyn Fn(&Url) -> Vec<Url> + Send + Sync>;

/// Compile regex sources, reporting the first invalid one.
pub fn compile_patterns(sources: &[String]) -> Result<Vec<Regex>, ConfigError> {
    sources
        .iter()
        .map(|source| {
            Regex::new(source).map_err(|e| ConfigError::InvalidPattern {
                pattern: source.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// How request URLs are varied before matching.
#[derive(Clone)]
pub struct InterceptOptions {
    pub directory_index: Option<String>,
    pub clean_urls: bool,
    pub ignore_url_parameters_matching: Vec<Regex>,
    pub url_manipulation: Option<UrlManipulation>,
}

impl InterceptOptions {
    pub fn from_settings(settings: &RoutingSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            directory_index: settings.directory_index.clone(),
            clean_urls: settings.clean_urls,
            ignore_url_parameters_matching: compile_patterns(
                &settings.ignore_url_parameters_matching,
            )?,
            url_manipulation: None,
        })
    }

    pub fn with_url_manipulation<F>(mut self, f: F) -> Self
    where
        F: Fn(&Url) -> Vec<Url> + Send + Sync + 'static,
    {
        self.url_manipulation = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for InterceptOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptOptions")
            .field("directory_index", &self.directory_index)
            .field("clean_urls", &self.clean_urls)
            .field(
                "ignore_url_parameters_matching",
                &self
                    .ignore_url_parameters_matching
                    .iter()
                    .map(Regex::as_str)
                    .collect::<Vec<_>>(),
            )
            .field("url_manipulation", &self.url_manipulation.is_some())
            .finish()
    }
}

/// Drop every query parameter whose name matches one of `patterns`. The
/// query is left untouched when nothing matches.
pub fn remove_ignored_search_params(url: &Url, patterns: &[Regex]) -> Url {
    let is_ignored = |name: &str| patterns.iter().any(|p| p.is_match(name));
    if !url.query_pairs().any(|(name, _)| is_ignored(&name)) {
        return url.clone();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_ignored(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}

/// The URL variations tried for `url`, in precedence order.
pub fn generate_url_variations(url: &Url, options: &InterceptOptions) -> Vec<Url> {
    let mut without_fragment = url.clone();
    without_fragment.set_fragment(None);

    let stripped =
        remove_ignored_search_params(&without_fragment, &options.ignore_url_parameters_matching);

    let mut variations = vec![without_fragment.clone(), stripped.clone()];

    if let Some(ref index) = options.directory_index {
        if stripped.path().ends_with('/') {
            let mut directory = stripped.clone();
            directory.set_path(&format!("{}{}", stripped.path(), index));
            variations.push(directory);
        }
    }

    if options.clean_urls {
        let mut clean = stripped.clone();
        clean.set_path(&format!("{}.html", stripped.path()));
        variations.push(clean);
    }

    if let Some(ref manipulate) = options.url_manipulation {
        variations.extend(manipulate(&without_fragment));
    }

    variations
}

/// The registry entry a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptMatch {
    pub cache_key: String,
    pub integrity: Option<String>,
}

/// Routes requests for precached URLs to the precache strategy.
#[derive(Debug, Clone)]
pub struct RequestInterceptor {
    controller: Arc<PrecacheController>,
    options: InterceptOptions,
}

impl RequestInterceptor {
    pub fn new(controller: Arc<PrecacheController>, options: InterceptOptions) -> Self {
        Self {
            controller,
            options,
        }
    }

    pub fn options(&self) -> &InterceptOptions {
        &self.options
    }

    /// Resolve `request` to a registry entry, if any variation is registered.
    pub fn matches(&self, request: &Request) -> Option<InterceptMatch> {
        if request.method != Method::GET {
            return None;
        }

        for candidate in generate_url_variations(&request.url, &self.options) {
            if let Some(cache_key) = self.controller.get_cache_key_for_url(candidate.as_str()) {
                trace!(url = %request.url, variation = %candidate, "Precache route matched");
                let integrity = self.controller.get_integrity_for_cache_key(&cache_key);
                return Some(InterceptMatch {
                    cache_key,
                    integrity,
                });
            }
        }

        debug!(url = %request.url, "Not a precached URL");
        None
    }

    /// Serve `request` from the precache. `Ok(None)` when it is not a
    /// precached URL.
    pub async fn handle(&self, request: Request) -> PrecacheResult<Option<HandleOutcome>> {
        let Some(matched) = self.matches(&request) else {
            return Ok(None);
        };
        self.handle_matched(request, matched, EventKind::Fetch)
            .await
            .map(Some)
    }

    /// Serve a request already resolved by [`RequestInterceptor::matches`].
    pub async fn handle_matched(
        &self,
        request: Request,
        matched: InterceptMatch,
        event: EventKind,
    ) -> PrecacheResult<HandleOutcome> {
        let ctx = HandlerContext::new(event)
            .with_cache_key(matched.cache_key)
            .with_integrity(matched.integrity);
        self.controller.strategy().handle(request, &ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{PrecacheControllerOptions, PrecacheHost};
    use crate::manifest::ManifestEntry;
    use crate::strategy::ResponseSource;
    use swkit_cache::{CacheNames, MemoryCacheStorage, QuotaErrorCallbacks};
    use swkit_net::integrity::{self, Algorithm};
    use swkit_net::StaticFetcher;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn defaults() -> InterceptOptions {
        InterceptOptions::from_settings(&RoutingSettings::default()).unwrap()
    }

    fn strings(urls: Vec<Url>) -> Vec<String> {
        urls.into_iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_variation_order() {
        let variations = generate_url_variations(
            &url("https://example.com/docs/?utm_source=x#intro"),
            &defaults(),
        );
        assert_eq!(
            strings(variations),
            vec![
                "https://example.com/docs/?utm_source=x",
                "https://example.com/docs/",
                "https://example.com/docs/index.html",
                "https://example.com/docs/.html",
            ]
        );
    }

    #[test]
    fn test_clean_url_variation() {
        let variations = generate_url_variations(&url("https://example.com/blog"), &defaults());
        assert_eq!(
            strings(variations),
            vec![
                "https://example.com/blog",
                "https://example.com/blog",
                "https://example.com/blog.html",
            ]
        );
    }

    #[test]
    fn test_disabled_variations() {
        let options = InterceptOptions {
            directory_index: None,
            clean_urls: false,
            ..defaults()
        };
        let variations = generate_url_variations(&url("https://example.com/docs/"), &options);
        assert_eq!(variations.len(), 2);
    }

    #[test]
    fn test_url_manipulation_runs_last() {
        let options = defaults().with_url_manipulation(|u| {
            vec![u.join("/fallback.html").unwrap()]
        });
        let variations = generate_url_variations(&url("https://example.com/a"), &options);
        assert_eq!(
            variations.last().map(Url::as_str),
            Some("https://example.com/fallback.html")
        );
    }

    #[test]
    fn test_remove_ignored_search_params() {
        let patterns = defaults().ignore_url_parameters_matching;
        let stripped = remove_ignored_search_params(
            &url("https://example.com/?utm_medium=a&q=1&fbclid=z&fbclid_x=2"),
            &patterns,
        );
        assert_eq!(stripped.as_str(), "https://example.com/?q=1&fbclid_x=2");

        let untouched =
            remove_ignored_search_params(&url("https://example.com/?q=a%20b"), &patterns);
        assert_eq!(untouched.as_str(), "https://example.com/?q=a%20b");
    }

    #[test]
    fn test_invalid_pattern() {
        let settings = RoutingSettings {
            ignore_url_parameters_matching: vec!["(".to_string()],
            ..Default::default()
        };
        let err = InterceptOptions::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "("));
    }

    struct Fixture {
        fetcher: Arc<StaticFetcher>,
        interceptor: RequestInterceptor,
    }

    async fn fixture(entries: &[ManifestEntry]) -> Fixture {
        let fetcher = Arc::new(StaticFetcher::new());
        let scope = url("https://example.com/");
        let host = PrecacheHost {
            location: url("https://example.com/sw.js"),
            storage: Arc::new(MemoryCacheStorage::new()),
            fetcher: fetcher.clone(),
            cache_names: CacheNames::new(&scope),
            quota_callbacks: QuotaErrorCallbacks::new(),
        };
        let controller = Arc::new(PrecacheController::new(
            host,
            PrecacheControllerOptions::default(),
        ));
        controller.add_to_cache_list(entries).unwrap();
        for cached in controller.get_cached_urls() {
            fetcher.insert(&url(&cached), cached.clone()).await;
        }
        controller.install().await.unwrap();

        Fixture {
            fetcher,
            interceptor: RequestInterceptor::new(controller, defaults()),
        }
    }

    fn key_for(f: &Fixture, request_url: &str) -> Option<String> {
        f.interceptor
            .matches(&Request::get(url(request_url)))
            .map(|m| m.cache_key)
    }

    #[tokio::test]
    async fn test_directory_index_match() {
        let f = fixture(&[ManifestEntry::revisioned("/blog/index.html", "r1")]).await;
        let expected = "https://example.com/blog/index.html?__WB_REVISION__=r1";

        assert_eq!(key_for(&f, "https://example.com/blog/").as_deref(), Some(expected));
        assert_eq!(key_for(&f, "https://example.com/blog/index.html").as_deref(), Some(expected));
        assert_eq!(key_for(&f, "https://example.com/blog"), None);
    }

    #[tokio::test]
    async fn test_clean_url_match() {
        let f = fixture(&[ManifestEntry::from("/about.html")]).await;
        assert_eq!(
            key_for(&f, "https://example.com/about?utm_campaign=x").as_deref(),
            Some("https://example.com/about.html")
        );
    }

    #[tokio::test]
    async fn test_exact_match_wins() {
        let f = fixture(&[
            ManifestEntry::from("/page"),
            ManifestEntry::from("/page.html"),
        ])
        .await;
        assert_eq!(
            key_for(&f, "https://example.com/page").as_deref(),
            Some("https://example.com/page")
        );
    }

    #[tokio::test]
    async fn test_integrity_is_carried() {
        let sri = integrity::compute(Algorithm::Sha256, b"https://example.com/a.js");
        let f = fixture(&[ManifestEntry::from("/a.js").with_integrity(sri.clone())]).await;
        let matched = f
            .interceptor
            .matches(&Request::get(url("https://example.com/a.js")))
            .unwrap();
        assert_eq!(matched.integrity, Some(sri));
    }

    #[tokio::test]
    async fn test_non_get_is_declined() {
        let f = fixture(&[ManifestEntry::from("/a.js")]).await;
        let mut request = Request::get(url("https://example.com/a.js"));
        request.method = Method::POST;
        assert!(f.interceptor.matches(&request).is_none());
    }

    #[tokio::test]
    async fn test_handle() {
        let f = fixture(&[ManifestEntry::revisioned("/index.html", "r1")]).await;

        let outcome = f
            .interceptor
            .handle(Request::navigate(url("https://example.com/")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(&outcome.response.body[..], b"https://example.com/index.html");

        let declined = f
            .interceptor
            .handle(Request::get(url("https://example.com/other.js")))
            .await
            .unwrap();
        assert!(declined.is_none());
        assert_eq!(f.fetcher.requests().await.len(), 1);
    }
}
