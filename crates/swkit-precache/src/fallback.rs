//! Offline fallback from the precache.

use std::sync::Arc;

use async_trait::async_trait;
use swkit_net::{Request, Response};
use tracing::{debug, warn};

use crate::controller::PrecacheController;
use crate::error::PrecacheError;
use crate::plugin::{HandlerContext, HandlerDidError};

/// Answers failed requests with a precached page, typically `offline.html`.
///
/// The controller serving the page must not own this plugin in its own
/// strategy; hand it to handlers of other routes instead.
#[derive(Debug, Clone)]
pub struct PrecacheFallbackPlugin {
    controller: Arc<PrecacheController>,
    fallback_url: String,
}

impl PrecacheFallbackPlugin {
    pub fn new(controller: Arc<PrecacheController>, fallback_url: impl Into<String>) -> Self {
        Self {
            controller,
            fallback_url: fallback_url.into(),
        }
    }

    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }
}

#[async_trait]
impl HandlerDidError for PrecacheFallbackPlugin {
    async fn handler_did_error(
        &self,
        request: &Request,
        error: &PrecacheError,
        _ctx: &HandlerContext,
    ) -> Option<Response> {
        match self.controller.match_precache(&self.fallback_url).await {
            Ok(Some(response)) => {
                debug!(
                    url = %request.url,
                    error = %error,
                    fallback = %self.fallback_url,
                    "Serving precached fallback"
                );
                Some(response)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(fallback = %self.fallback_url, error = %e, "Fallback lookup failed");
                None
            }
        }
    }
}
