//! Strategy hooks.
//!
//! Each hook is its own trait with a typed signature. A [`Plugin`] wraps one
//! hook implementation, and a [`PluginSet`] runs every plugin of a given
//! kind in registration order. An object implementing several hooks is
//! registered once per hook (see [`PluginSet::push`]).

use std::sync::Arc;

use async_trait::async_trait;
use swkit_net::{NetError, Request, Response};

use crate::error::PrecacheError;

/// The event that triggered a strategy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Install,
    Fetch,
    Message,
}

/// Per-run context passed to every hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContext {
    pub event: EventKind,
    /// Precache key the request should be served from, when the caller
    /// already resolved it.
    pub cache_key: Option<String>,
    /// Integrity metadata the manifest declares for `cache_key`.
    pub integrity: Option<String>,
}

impl HandlerContext {
    pub fn new(event: EventKind) -> Self {
        Self {
            event,
            cache_key: None,
            integrity: None,
        }
    }

    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = Some(cache_key.into());
        self
    }

    pub fn with_integrity(mut self, integrity: Option<String>) -> Self {
        self.integrity = integrity;
        self
    }
}

/// Whether a cache key is needed for reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKeyMode {
    Read,
    Write,
}

#[async_trait]
pub trait RequestWillFetch: Send + Sync {
    /// Adjust a request right before it goes to the network.
    async fn request_will_fetch(&self, request: Request, ctx: &HandlerContext) -> Request;
}

#[async_trait]
pub trait FetchDidSucceed: Send + Sync {
    /// Inspect or replace a network response.
    async fn fetch_did_succeed(
        &self,
        request: &Request,
        response: Response,
        ctx: &HandlerContext,
    ) -> Response;
}

#[async_trait]
pub trait FetchDidFail: Send + Sync {
    /// Observe a failed network request. The error is still propagated.
    async fn fetch_did_fail(
        &self,
        original_request: &Request,
        request: &Request,
        error: &NetError,
        ctx: &HandlerContext,
    );
}

#[async_trait]
pub trait CacheKeyWillBeUsed: Send + Sync {
    /// Rewrite the request used as the cache key.
    async fn cache_key_will_be_used(
        &self,
        request: Request,
        mode: CacheKeyMode,
        ctx: &HandlerContext,
    ) -> Request;
}

#[async_trait]
pub trait CacheWillUpdate: Send + Sync {
    /// Decide whether (and what) to store. `None` skips the write.
    async fn cache_will_update(
        &self,
        request: &Request,
        response: Response,
        ctx: &HandlerContext,
    ) -> Option<Response>;
}

#[async_trait]
pub trait CachedResponseWillBeUsed: Send + Sync {
    /// Inspect or replace a cache lookup result.
    async fn cached_response_will_be_used(
        &self,
        cache_name: &str,
        request: &Request,
        cached: Option<Response>,
        ctx: &HandlerContext,
    ) -> Option<Response>;
}

#[async_trait]
pub trait CacheDidUpdate: Send + Sync {
    /// Observe a completed write. `old_response` is the entry previously
    /// stored for the same URL, ignoring the revision parameter.
    async fn cache_did_update(
        &self,
        cache_name: &str,
        request: &Request,
        old_response: Option<&Response>,
        new_response: &Response,
        ctx: &HandlerContext,
    );
}

#[async_trait]
pub trait HandlerDidError: Send + Sync {
    /// Offer a substitute response for a failed runtime request.
    async fn handler_did_error(
        &self,
        request: &Request,
        error: &PrecacheError,
        ctx: &HandlerContext,
    ) -> Option<Response>;
}

/// One hook implementation.
#[derive(Clone)]
pub enum Plugin {
    RequestWillFetch(Arc<dyn RequestWillFetch>),
    FetchDidSucceed(Arc<dyn FetchDidSucceed>),
    FetchDidFail(Arc<dyn FetchDidFail>),
    CacheKeyWillBeUsed(Arc<dyn CacheKeyWillBeUsed>),
    CacheWillUpdate(Arc<dyn CacheWillUpdate>),
    CachedResponseWillBeUsed(Arc<dyn CachedResponseWillBeUsed>),
    CacheDidUpdate(Arc<dyn CacheDidUpdate>),
    HandlerDidError(Arc<dyn HandlerDidError>),
}

impl Plugin {
    pub fn name(&self) -> &'static str {
        match self {
            Plugin::RequestWillFetch(_) => "requestWillFetch",
            Plugin::FetchDidSucceed(_) => "fetchDidSucceed",
            Plugin::FetchDidFail(_) => "fetchDidFail",
            Plugin::CacheKeyWillBeUsed(_) => "cacheKeyWillBeUsed",
            Plugin::CacheWillUpdate(_) => "cacheWillUpdate",
            Plugin::CachedResponseWillBeUsed(_) => "cachedResponseWillBeUsed",
            Plugin::CacheDidUpdate(_) => "cacheDidUpdate",
            Plugin::HandlerDidError(_) => "handlerDidError",
        }
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Plugin").field(&self.name()).finish()
    }
}

/// An ordered list of hooks.
#[derive(Debug, Clone, Default)]
pub struct PluginSet {
    plugins: Vec<Plugin>,
}

impl PluginSet {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self { plugins }
    }

    pub fn push(&mut self, plugin: Plugin) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn has_cache_will_update(&self) -> bool {
        self.plugins
            .iter()
            .any(|p| matches!(p, Plugin::CacheWillUpdate(_)))
    }

    pub fn has_cache_did_update(&self) -> bool {
        self.plugins
            .iter()
            .any(|p| matches!(p, Plugin::CacheDidUpdate(_)))
    }

    pub async fn request_will_fetch(&self, mut request: Request, ctx: &HandlerContext) -> Request {
        for plugin in &self.plugins {
            if let Plugin::RequestWillFetch(hook) = plugin {
                request = hook.request_will_fetch(request, ctx).await;
            }
        }
        request
    }

    pub async fn fetch_did_succeed(
        &self,
        request: &Request,
        mut response: Response,
        ctx: &HandlerContext,
    ) -> Response {
        for plugin in &self.plugins {
            if let Plugin::FetchDidSucceed(hook) = plugin {
                response = hook.fetch_did_succeed(request, response, ctx).await;
            }
        }
        response
    }

    pub async fn fetch_did_fail(
        &self,
        original_request: &Request,
        request: &Request,
        error: &NetError,
        ctx: &HandlerContext,
    ) {
        for plugin in &self.plugins {
            if let Plugin::FetchDidFail(hook) = plugin {
                hook.fetch_did_fail(original_request, request, error, ctx)
                    .await;
            }
        }
    }

    pub async fn cache_key_will_be_used(
        &self,
        mut request: Request,
        mode: CacheKeyMode,
        ctx: &HandlerContext,
    ) -> Request {
        for plugin in &self.plugins {
            if let Plugin::CacheKeyWillBeUsed(hook) = plugin {
                request = hook.cache_key_will_be_used(request, mode, ctx).await;
            }
        }
        request
    }

    /// Run the custom cacheability hooks. Stops at the first `None`.
    pub async fn cache_will_update(
        &self,
        request: &Request,
        response: Response,
        ctx: &HandlerContext,
    ) -> Option<Response> {
        let mut response = Some(response);
        for plugin in &self.plugins {
            if let Plugin::CacheWillUpdate(hook) = plugin {
                response = hook.cache_will_update(request, response?, ctx).await;
            }
        }
        response
    }

    pub async fn cached_response_will_be_used(
        &self,
        cache_name: &str,
        request: &Request,
        mut cached: Option<Response>,
        ctx: &HandlerContext,
    ) -> Option<Response> {
        for plugin in &self.plugins {
            if let Plugin::CachedResponseWillBeUsed(hook) = plugin {
                cached = hook
                    .cached_response_will_be_used(cache_name, request, cached, ctx)
                    .await;
            }
        }
        cached
    }

    pub async fn cache_did_update(
        &self,
        cache_name: &str,
        request: &Request,
        old_response: Option<&Response>,
        new_response: &Response,
        ctx: &HandlerContext,
    ) {
        for plugin in &self.plugins {
            if let Plugin::CacheDidUpdate(hook) = plugin {
                hook.cache_did_update(cache_name, request, old_response, new_response, ctx)
                    .await;
            }
        }
    }

    /// First substitute response offered by a `HandlerDidError` hook.
    pub async fn handler_did_error(
        &self,
        request: &Request,
        error: &PrecacheError,
        ctx: &HandlerContext,
    ) -> Option<Response> {
        for plugin in &self.plugins {
            if let Plugin::HandlerDidError(hook) = plugin {
                if let Some(response) = hook.handler_did_error(request, error, ctx).await {
                    return Some(response);
                }
            }
        }
        None
    }
}
