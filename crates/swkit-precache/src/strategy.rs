//! Precache strategy.
//!
//! ```text
//! handle(request)
//!     │
//!     ├── cache hit ──────────────────────────────► response
//!     │
//!     └── miss
//!          ├── install event ── fetch ── store ───► response
//!          │                              └─ not cacheable ─► BadPrecachingResponse
//!          │
//!          └── runtime event
//!                 ├── fallback disabled ──────────► MissingPrecacheEntry
//!                 └── fetch (with manifest integrity)
//!                        └── best-effort repair ──► response
//! ```
//!
//! Every cache read and write goes through the strategy's single named
//! cache, with the request key rewritten by the `CacheKeyWillBeUsed` hooks.

use std::sync::Arc;

use http::Method;
use swkit_cache::{cache_match_ignore_params, CacheError, CacheStorage, QuotaErrorCallbacks};
use swkit_net::{Fetcher, Request, Response};
use tracing::{debug, trace, warn};

use crate::cache_key::REVISION_SEARCH_PARAM;
use crate::error::{PrecacheError, PrecacheResult};
use crate::plugin::{CacheKeyMode, EventKind, HandlerContext, Plugin, PluginSet};

/// Where a handled response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from the precache.
    Cache,
    /// Fetched and stored during install.
    Populated,
    /// Fetched at runtime after a precache miss. `repaired` tells whether the
    /// response was written back to the precache.
    Network { repaired: bool },
    /// Substituted by a `HandlerDidError` hook.
    Fallback,
}

/// A response and its origin.
#[derive(Debug, Clone)]
pub struct HandleOutcome {
    pub response: Response,
    pub source: ResponseSource,
}

/// How responses are vetted before they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cacheability {
    /// Accept any response with a status below 400.
    Default,
    /// Only the configured `CacheWillUpdate` hooks decide.
    Custom,
}

/// Options for [`PrecacheStrategy`].
#[derive(Debug, Clone)]
pub struct PrecacheStrategyOptions {
    pub cache_name: String,
    pub plugins: Vec<Plugin>,
    pub fallback_to_network: bool,
}

/// Serves requests from the precache and populates it during install.
pub struct PrecacheStrategy {
    cache_name: String,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    quota_callbacks: QuotaErrorCallbacks,
    plugins: PluginSet,
    cacheability: Cacheability,
    fallback_to_network: bool,
}

impl PrecacheStrategy {
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        quota_callbacks: QuotaErrorCallbacks,
        options: PrecacheStrategyOptions,
    ) -> Self {
        let plugins = PluginSet::new(options.plugins);
        let cacheability = if plugins.has_cache_will_update() {
            Cacheability::Custom
        } else {
            Cacheability::Default
        };

        Self {
            cache_name: options.cache_name,
            storage,
            fetcher,
            quota_callbacks,
            plugins,
            cacheability,
            fallback_to_network: options.fallback_to_network,
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn fallback_to_network(&self) -> bool {
        self.fallback_to_network
    }

    pub fn uses_default_cacheability(&self) -> bool {
        self.cacheability == Cacheability::Default
    }

    /// Produce a response for `request`.
    ///
    /// Runtime failures are offered to `HandlerDidError` hooks first.
    /// Install failures always propagate, so a broken deployment never
    /// activates.
    pub async fn handle(
        &self,
        request: Request,
        ctx: &HandlerContext,
    ) -> PrecacheResult<HandleOutcome> {
        match self.handle_inner(request.clone(), ctx).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if ctx.event == EventKind::Install => Err(err),
            Err(err) => match self.plugins.handler_did_error(&request, &err, ctx).await {
                Some(response) => {
                    debug!(url = %request.url, error = %err, "Serving fallback response");
                    Ok(HandleOutcome {
                        response,
                        source: ResponseSource::Fallback,
                    })
                }
                None => Err(err),
            },
        }
    }

    async fn handle_inner(
        &self,
        request: Request,
        ctx: &HandlerContext,
    ) -> PrecacheResult<HandleOutcome> {
        if let Some(response) = self.cache_match(&request, ctx).await? {
            trace!(url = %request.url, "Precache hit");
            return Ok(HandleOutcome {
                response,
                source: ResponseSource::Cache,
            });
        }

        if ctx.event == EventKind::Install {
            return self.handle_install(request, ctx).await;
        }
        self.handle_fetch(request, ctx).await
    }

    async fn handle_install(
        &self,
        request: Request,
        ctx: &HandlerContext,
    ) -> PrecacheResult<HandleOutcome> {
        let response = self.fetch(request.clone(), ctx).await?;
        let status = response.status;

        if !self.cache_put(&request, response.clone(), ctx).await? {
            return Err(PrecacheError::BadPrecachingResponse {
                url: request.url.to_string(),
                status: Some(status.as_u16()),
            });
        }

        Ok(HandleOutcome {
            response,
            source: ResponseSource::Populated,
        })
    }

    async fn handle_fetch(
        &self,
        request: Request,
        ctx: &HandlerContext,
    ) -> PrecacheResult<HandleOutcome> {
        if !self.fallback_to_network {
            return Err(PrecacheError::MissingPrecacheEntry {
                cache_name: self.cache_name.clone(),
                url: request.url.to_string(),
            });
        }

        let manifest_integrity = ctx.integrity.as_deref();
        let no_conflict = match (request.integrity.as_deref(), manifest_integrity) {
            (None, _) => true,
            (Some(requested), Some(expected)) => requested == expected,
            (Some(_), None) => false,
        };
        let checkable = request.integrity_checkable();

        let mut network_request = request.clone();
        network_request.integrity = if checkable {
            request
                .integrity
                .clone()
                .or_else(|| manifest_integrity.map(str::to_string))
        } else {
            None
        };

        warn!(
            url = %request.url,
            cache = %self.cache_name,
            "Precached response missing, falling back to the network"
        );
        let response = self.fetch(network_request, ctx).await?;

        // Only a response verified against the manifest's integrity is safe
        // to store under the manifest's cache key.
        let mut repaired = false;
        if manifest_integrity.is_some() && no_conflict && checkable {
            match self.cache_put(&request, response.clone(), ctx).await {
                Ok(stored) => repaired = stored,
                Err(e) => warn!(url = %request.url, error = %e, "Precache repair failed"),
            }
        }
        if repaired {
            debug!(url = %request.url, "Repaired precache entry");
        }

        Ok(HandleOutcome {
            response,
            source: ResponseSource::Network { repaired },
        })
    }

    /// Look up `request` in the precache.
    pub async fn cache_match(
        &self,
        request: &Request,
        ctx: &HandlerContext,
    ) -> PrecacheResult<Option<Response>> {
        let key = self
            .plugins
            .cache_key_will_be_used(request.clone(), CacheKeyMode::Read, ctx)
            .await;
        let cached = self
            .storage
            .match_request(&self.cache_name, key.url.as_str())
            .await?;
        Ok(self
            .plugins
            .cached_response_will_be_used(&self.cache_name, &key, cached, ctx)
            .await)
    }

    /// Store `response` for `request`. Returns `false` when the cacheability
    /// rules rejected the response.
    pub async fn cache_put(
        &self,
        request: &Request,
        response: Response,
        ctx: &HandlerContext,
    ) -> PrecacheResult<bool> {
        let key = self
            .plugins
            .cache_key_will_be_used(request.clone(), CacheKeyMode::Write, ctx)
            .await;
        if key.method != Method::GET {
            return Err(CacheError::NonGetRequest(key.method.clone()).into());
        }

        let Some(to_cache) = self.response_safe_to_cache(&key, response, ctx).await else {
            debug!(url = %key.url, "Response not cacheable");
            return Ok(false);
        };

        let old_response = if self.plugins.has_cache_did_update() {
            cache_match_ignore_params(
                self.storage.as_ref(),
                &self.cache_name,
                key.url.as_str(),
                &[REVISION_SEARCH_PARAM],
            )
            .await?
        } else {
            None
        };

        if let Err(e) = self.storage.put(&self.cache_name, &key, &to_cache).await {
            if e.is_quota_exceeded() {
                self.quota_callbacks.run().await;
            }
            return Err(e.into());
        }

        self.plugins
            .cache_did_update(
                &self.cache_name,
                &key,
                old_response.as_ref(),
                &to_cache,
                ctx,
            )
            .await;
        Ok(true)
    }

    /// Fetch from the network through the fetch hooks.
    pub async fn fetch(&self, request: Request, ctx: &HandlerContext) -> PrecacheResult<Response> {
        let original = request.clone();
        let request = self.plugins.request_will_fetch(request, ctx).await;

        match self.fetcher.fetch(request.clone()).await {
            Ok(response) => Ok(self
                .plugins
                .fetch_did_succeed(&request, response, ctx)
                .await),
            Err(e) => {
                self.plugins
                    .fetch_did_fail(&original, &request, &e, ctx)
                    .await;
                Err(e.into())
            }
        }
    }

    async fn response_safe_to_cache(
        &self,
        request: &Request,
        response: Response,
        ctx: &HandlerContext,
    ) -> Option<Response> {
        let response = match self.cacheability {
            Cacheability::Default => (response.status.as_u16() < 400).then_some(response),
            Cacheability::Custom => {
                self.plugins
                    .cache_will_update(request, response, ctx)
                    .await
            }
        }?;

        // Redirected responses cannot answer navigations; store a copy.
        if response.redirected {
            return Some(response.copy_without_redirect());
        }
        Some(response)
    }
}

impl std::fmt::Debug for PrecacheStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrecacheStrategy")
            .field("cache_name", &self.cache_name)
            .field("plugins", &self.plugins)
            .field("cacheability", &self.cacheability)
            .field("fallback_to_network", &self.fallback_to_network)
            .finish()
    }
}
