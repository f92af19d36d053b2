//! Request router.
//!
//! Routes are tried in registration order and the first match handles the
//! request. A failing route is offered to the catch handler before its
//! error is returned. Requests no route matches go to the network, which
//! the host signals by getting `None` back.

use swkit_net::{Request, Response};
use swkit_precache::plugin::HandlerDidError;
use swkit_precache::{
    EventKind, HandleOutcome, HandlerContext, InterceptMatch, PrecacheFallbackPlugin,
    PrecacheResult, RequestInterceptor,
};
use tracing::{debug, warn};

use crate::navigation::NavigationRoute;

/// A route the worker can serve.
#[derive(Debug, Clone)]
pub enum Route {
    /// Precached URLs and their variations.
    Precache(RequestInterceptor),
    /// Navigations answered with one precached page.
    Navigation(NavigationRoute),
}

enum RouteMatch<'a> {
    Precache(&'a RequestInterceptor, InterceptMatch),
    Navigation(&'a NavigationRoute),
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Precache(_) => "precache",
            Route::Navigation(_) => "navigation",
        }
    }

    fn matches(&self, request: &Request) -> Option<RouteMatch<'_>> {
        match self {
            Route::Precache(interceptor) => interceptor
                .matches(request)
                .map(|m| RouteMatch::Precache(interceptor, m)),
            Route::Navigation(route) => route
                .matches(request)
                .then_some(RouteMatch::Navigation(route)),
        }
    }
}

impl RouteMatch<'_> {
    async fn handle(self, request: Request, event: EventKind) -> PrecacheResult<HandleOutcome> {
        match self {
            RouteMatch::Precache(interceptor, m) => {
                interceptor.handle_matched(request, m, event).await
            }
            RouteMatch::Navigation(route) => route.handle(event).await,
        }
    }
}

/// Ordered routes plus an optional catch handler.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    catch_handler: Option<PrecacheFallbackPlugin>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_route(&mut self, route: Route) {
        debug!(route = route.name(), position = self.routes.len(), "Registered route");
        self.routes.push(route);
    }

    pub fn set_catch_handler(&mut self, handler: PrecacheFallbackPlugin) {
        self.catch_handler = Some(handler);
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Route `request`. `Ok(None)` when no route claims it.
    pub async fn handle_request(
        &self,
        request: Request,
        event: EventKind,
    ) -> PrecacheResult<Option<Response>> {
        if !request.url.scheme().starts_with("http") {
            debug!(url = %request.url, "Ignoring non-HTTP request");
            return Ok(None);
        }

        let Some(matched) = self.routes.iter().find_map(|route| route.matches(&request)) else {
            return Ok(None);
        };

        match matched.handle(request.clone(), event).await {
            Ok(outcome) => Ok(Some(outcome.response)),
            Err(err) => {
                if let Some(ref catch) = self.catch_handler {
                    let ctx = HandlerContext::new(event);
                    if let Some(response) = catch.handler_did_error(&request, &err, &ctx).await {
                        return Ok(Some(response));
                    }
                }
                warn!(url = %request.url, error = %err, "Route failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use swkit_cache::{CacheNames, CacheStorage, MemoryCacheStorage, QuotaErrorCallbacks};
    use swkit_common::{NavigationFallbackSettings, RoutingSettings};
    use swkit_net::StaticFetcher;
    use swkit_precache::{
        InterceptOptions, ManifestEntry, PrecacheController, PrecacheControllerOptions,
        PrecacheHost,
    };
    use url::Url;

    struct Fixture {
        storage: Arc<MemoryCacheStorage>,
        controller: Arc<PrecacheController>,
    }

    fn url(path: &str) -> Url {
        Url::parse("https://example.com/").unwrap().join(path).unwrap()
    }

    async fn fixture(fallback_to_network: bool) -> Fixture {
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(StaticFetcher::new());
        for (path, body) in [
            ("/index.html", "shell"),
            ("/offline.html", "offline"),
            ("/a.js", "js"),
        ] {
            fetcher.insert(&url(path), body).await;
        }

        let controller = Arc::new(PrecacheController::new(
            PrecacheHost {
                location: url("/sw.js"),
                storage: storage.clone(),
                fetcher,
                cache_names: CacheNames::new(&url("/")),
                quota_callbacks: QuotaErrorCallbacks::new(),
            },
            PrecacheControllerOptions {
                fallback_to_network,
                ..Default::default()
            },
        ));
        controller
            .add_to_cache_list(&[
                ManifestEntry::revisioned("/index.html", "1"),
                ManifestEntry::revisioned("/offline.html", "1"),
                ManifestEntry::from("/a.js"),
            ])
            .unwrap();
        controller.install().await.unwrap();

        Fixture {
            storage,
            controller,
        }
    }

    fn router(f: &Fixture) -> Router {
        let mut router = Router::new();
        router.register_route(Route::Precache(RequestInterceptor::new(
            f.controller.clone(),
            InterceptOptions::from_settings(&RoutingSettings::default()).unwrap(),
        )));
        router.register_route(Route::Navigation(
            NavigationRoute::from_settings(
                &f.controller,
                &NavigationFallbackSettings {
                    url: "/index.html".to_string(),
                    ..Default::default()
                },
            )
            .unwrap(),
        ));
        router
    }

    #[tokio::test]
    async fn test_first_matching_route_wins() {
        let f = fixture(true).await;
        let router = router(&f);

        let offline = router
            .handle_request(Request::navigate(url("/offline")), EventKind::Fetch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&offline.body[..], b"offline");

        let shell = router
            .handle_request(Request::navigate(url("/app/deep/link")), EventKind::Fetch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&shell.body[..], b"shell");
    }

    #[tokio::test]
    async fn test_unmatched_goes_to_network() {
        let f = fixture(true).await;
        let router = router(&f);

        let response = router
            .handle_request(Request::get(url("/api/data")), EventKind::Fetch)
            .await
            .unwrap();
        assert!(response.is_none());

        let other_scheme = Request::get(Url::parse("data:text/plain,hi").unwrap());
        assert!(router
            .handle_request(other_scheme, EventKind::Fetch)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_catch_handler_rescues_failed_route() {
        let f = fixture(false).await;
        let key = f.controller.get_cache_key_for_url("/a.js").unwrap();
        f.storage
            .delete(f.controller.cache_name(), &key)
            .await
            .unwrap();

        let mut router = router(&f);
        let err = router
            .handle_request(Request::get(url("/a.js")), EventKind::Fetch)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "missing-precache-entry");

        router.set_catch_handler(PrecacheFallbackPlugin::new(
            f.controller.clone(),
            "/offline.html",
        ));
        let response = router
            .handle_request(Request::get(url("/a.js")), EventKind::Fetch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&response.body[..], b"offline");
    }
}
