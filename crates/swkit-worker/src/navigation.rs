//! Navigation route.
//!
//! Answers navigations with one precached page, the usual setup for
//! single-page apps whose routes only exist client-side.

use regex::Regex;
use swkit_common::NavigationFallbackSettings;
use swkit_net::{Request, RequestMode};
use swkit_precache::{
    compile_patterns, BoundHandler, EventKind, HandleOutcome, PrecacheController, PrecacheResult,
};
use tracing::trace;

use crate::error::ServiceWorkerError;

/// Routes navigation requests to a handler bound to one precached URL.
///
/// The path and query of a navigation must match no denylist pattern and,
/// when an allowlist is set, at least one allowlist pattern.
#[derive(Debug, Clone)]
pub struct NavigationRoute {
    handler: BoundHandler,
    allowlist: Vec<Regex>,
    denylist: Vec<Regex>,
}

impl NavigationRoute {
    pub fn new(handler: BoundHandler) -> Self {
        Self {
            handler,
            allowlist: Vec::new(),
            denylist: Vec::new(),
        }
    }

    /// Build the route described by `settings`. Fails when the URL is not
    /// precached or a pattern does not compile.
    pub fn from_settings(
        controller: &PrecacheController,
        settings: &NavigationFallbackSettings,
    ) -> Result<Self, ServiceWorkerError> {
        let handler = controller.create_handler_bound_to_url(&settings.url)?;
        Ok(Self::new(handler)
            .with_allowlist(compile_patterns(&settings.allowlist)?)
            .with_denylist(compile_patterns(&settings.denylist)?))
    }

    pub fn with_allowlist(mut self, allowlist: Vec<Regex>) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn with_denylist(mut self, denylist: Vec<Regex>) -> Self {
        self.denylist = denylist;
        self
    }

    pub fn handler(&self) -> &BoundHandler {
        &self.handler
    }

    pub fn matches(&self, request: &Request) -> bool {
        if request.mode != RequestMode::Navigate {
            return false;
        }

        let url = &request.url;
        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        if self.denylist.iter().any(|re| re.is_match(&path_and_query)) {
            trace!(path = %path_and_query, "Navigation denied by denylist");
            return false;
        }
        if self.allowlist.is_empty()
            || self.allowlist.iter().any(|re| re.is_match(&path_and_query))
        {
            return true;
        }

        trace!(path = %path_and_query, "Navigation not in allowlist");
        false
    }

    pub async fn handle(&self, event: EventKind) -> PrecacheResult<HandleOutcome> {
        self.handler.handle(event).await
    }
}
