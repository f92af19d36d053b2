//! Service worker global scope.
//!
//! ```text
//! Parsed ──install──► Installing ──ok──► Installed ──activate──► Activating ──► Activated
//!                          │
//!                          └──error──► Redundant
//! ```
//!
//! The scope owns the worker's precache controller, created on first use
//! and kept for the life of the worker, and the router that fetch and
//! message events go through.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use swkit_cache::{CacheNames, CacheStorage, QuotaErrorCallbacks};
use swkit_common::{init_logging, LogConfig, WorkerConfig};
use swkit_net::{Fetcher, Request, Response};
use swkit_precache::{
    delete_outdated_caches, CleanupResult, EventKind, InstallResult, InterceptOptions, Manifest,
    ManifestEntry, PrecacheController, PrecacheControllerOptions, PrecacheFallbackPlugin,
    PrecacheHost, RegisterReport, RequestInterceptor,
};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ServiceWorkerError;
use crate::message::{UrlToCache, WorkerMessage};
use crate::navigation::NavigationRoute;
use crate::router::{Route, Router};
use crate::state::{ServiceWorkerEvent, ServiceWorkerId, ServiceWorkerState};

/// Where the worker runs and what it can reach.
#[derive(Clone)]
pub struct WorkerHost {
    /// URL of the worker script.
    pub location: Url,
    /// Registration scope; defaults to the script's directory.
    pub scope: Option<Url>,
    pub storage: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
}

impl WorkerHost {
    fn scope_url(&self) -> Url {
        self.scope.clone().unwrap_or_else(|| {
            let mut scope = self.location.clone();
            let dir = match self.location.path().rsplit_once('/') {
                Some((dir, _)) => format!("{dir}/"),
                None => "/".to_string(),
            };
            scope.set_path(&dir);
            scope.set_query(None);
            scope.set_fragment(None);
            scope
        })
    }
}

/// Result of a handled message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOutcome {
    /// URLs a route answered.
    pub handled: Vec<String>,
    /// URLs no route claimed.
    pub unmatched: Vec<String>,
    /// URLs whose route failed, with the error.
    pub failed: Vec<(String, String)>,
}

/// One worker version.
pub struct ServiceWorkerGlobalScope {
    id: ServiceWorkerId,
    config: WorkerConfig,
    location: Url,
    scope: Url,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    cache_names: CacheNames,
    quota_callbacks: QuotaErrorCallbacks,
    controller: OnceLock<Arc<PrecacheController>>,
    precache_routed: AtomicBool,
    router: RwLock<Router>,
    state: RwLock<ServiceWorkerState>,
    skip_waiting: AtomicBool,
    event_tx: mpsc::UnboundedSender<ServiceWorkerEvent>,
}

impl ServiceWorkerGlobalScope {
    /// Create the scope for a freshly evaluated worker script.
    pub async fn new(
        host: WorkerHost,
        config: WorkerConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServiceWorkerEvent>), ServiceWorkerError> {
        config.validate()?;
        let scope = host.scope_url();
        let cache_names = CacheNames::with_settings(&scope, &config.cache_names)?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let quota_callbacks = QuotaErrorCallbacks::new();
        let quota_tx = event_tx.clone();
        quota_callbacks
            .register(move || {
                let _ = quota_tx.send(ServiceWorkerEvent::QuotaExceeded);
            })
            .await;

        let id = ServiceWorkerId::new();
        debug!(worker = id.as_u64(), script = %host.location, scope = %scope, "Worker created");

        Ok((
            Self {
                id,
                config,
                location: host.location,
                scope,
                storage: host.storage,
                fetcher: host.fetcher,
                cache_names,
                quota_callbacks,
                controller: OnceLock::new(),
                precache_routed: AtomicBool::new(false),
                router: RwLock::new(Router::new()),
                state: RwLock::new(ServiceWorkerState::Parsed),
                skip_waiting: AtomicBool::new(false),
                event_tx,
            },
            event_rx,
        ))
    }

    /// Set up logging and a scope serving `manifest`, with the routes the
    /// configuration asks for.
    pub async fn bootstrap(
        host: WorkerHost,
        config: WorkerConfig,
        manifest: &Manifest,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServiceWorkerEvent>), ServiceWorkerError> {
        init_logging(LogConfig::from_settings(&config.log)?);

        let (scope, events) = Self::new(host, config).await?;
        scope.precache_and_route(manifest.entries(), None).await?;

        if let Some(ref navigation) = scope.config.navigation_fallback {
            let route = NavigationRoute::from_settings(scope.precache_controller(), navigation)?;
            scope.register_route(Route::Navigation(route)).await;
        }
        if let Some(ref fallback_url) = scope.config.precache.offline_fallback_url {
            let controller = scope.precache_controller().clone();
            if controller.get_cache_key_for_url(fallback_url).is_none() {
                warn!(url = %fallback_url, "Offline fallback is not precached");
            }
            scope
                .router
                .write()
                .await
                .set_catch_handler(PrecacheFallbackPlugin::new(controller, fallback_url.clone()));
        }

        Ok((scope, events))
    }

    pub fn id(&self) -> ServiceWorkerId {
        self.id
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn scope(&self) -> &Url {
        &self.scope
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache_names(&self) -> &CacheNames {
        &self.cache_names
    }

    pub fn storage(&self) -> &Arc<dyn CacheStorage> {
        &self.storage
    }

    pub fn quota_callbacks(&self) -> &QuotaErrorCallbacks {
        &self.quota_callbacks
    }

    pub async fn state(&self) -> ServiceWorkerState {
        *self.state.read().await
    }

    /// The worker's precache controller, created on first call.
    pub fn precache_controller(&self) -> &Arc<PrecacheController> {
        self.controller.get_or_init(|| {
            let host = PrecacheHost {
                location: self.location.clone(),
                storage: self.storage.clone(),
                fetcher: self.fetcher.clone(),
                cache_names: self.cache_names.clone(),
                quota_callbacks: self.quota_callbacks.clone(),
            };
            let options = PrecacheControllerOptions {
                cache_name: self.config.precache.cache_name.clone(),
                plugins: Vec::new(),
                fallback_to_network: self.config.precache.fallback_to_network,
            };
            Arc::new(PrecacheController::new(host, options))
        })
    }

    /// Add entries to the precache manifest.
    pub fn precache(
        &self,
        entries: &[ManifestEntry],
    ) -> Result<RegisterReport, ServiceWorkerError> {
        Ok(self.precache_controller().add_to_cache_list(entries)?)
    }

    pub async fn register_route(&self, route: Route) {
        self.router.write().await.register_route(route);
    }

    /// Precache `entries` and route requests for them. The route is added
    /// once; later calls only add entries. `options` default to the
    /// configured routing settings.
    pub async fn precache_and_route(
        &self,
        entries: &[ManifestEntry],
        options: Option<InterceptOptions>,
    ) -> Result<RegisterReport, ServiceWorkerError> {
        let report = self.precache(entries)?;

        if !self.precache_routed.swap(true, Ordering::SeqCst) {
            let options = match options {
                Some(options) => options,
                None => InterceptOptions::from_settings(&self.config.routing)?,
            };
            let interceptor = RequestInterceptor::new(self.precache_controller().clone(), options);
            self.register_route(Route::Precache(interceptor)).await;
        }

        Ok(report)
    }

    /// Run the install event. A failure makes this worker redundant.
    pub async fn dispatch_install(&self) -> Result<InstallResult, ServiceWorkerError> {
        self.transition("install", ServiceWorkerState::Parsed, ServiceWorkerState::Installing)
            .await?;

        match self.precache_controller().install().await {
            Ok(result) => {
                self.set_state(ServiceWorkerState::Installed).await;
                let _ = self.event_tx.send(ServiceWorkerEvent::Installed {
                    updated_urls: result.updated_urls.clone(),
                    not_updated_urls: result.not_updated_urls.clone(),
                });
                Ok(result)
            }
            Err(e) => {
                warn!(worker = self.id.as_u64(), error = %e, "Install failed");
                self.set_state(ServiceWorkerState::Redundant).await;
                Err(e.into())
            }
        }
    }

    /// Run the activate event. On failure the worker stays installed and
    /// activation may be retried.
    pub async fn dispatch_activate(&self) -> Result<CleanupResult, ServiceWorkerError> {
        self.transition("activate", ServiceWorkerState::Installed, ServiceWorkerState::Activating)
            .await?;

        match self.activate_inner().await {
            Ok((result, deleted_caches)) => {
                self.set_state(ServiceWorkerState::Activated).await;
                let _ = self.event_tx.send(ServiceWorkerEvent::Activated {
                    deleted_urls: result.deleted_urls.clone(),
                    deleted_caches,
                });
                Ok(result)
            }
            Err(e) => {
                warn!(worker = self.id.as_u64(), error = %e, "Activate failed");
                self.set_state(ServiceWorkerState::Installed).await;
                Err(e)
            }
        }
    }

    async fn activate_inner(&self) -> Result<(CleanupResult, Vec<String>), ServiceWorkerError> {
        let controller = self.precache_controller();
        let deleted_caches = if self.config.precache.cleanup_outdated_caches {
            delete_outdated_caches(
                self.storage.as_ref(),
                controller.cache_name(),
                self.scope.as_str(),
            )
            .await?
        } else {
            Vec::new()
        };
        Ok((controller.activate().await?, deleted_caches))
    }

    /// Run a fetch event. `Ok(None)` means the request goes to the network.
    pub async fn dispatch_fetch(
        &self,
        request: Request,
    ) -> Result<Option<Response>, ServiceWorkerError> {
        let state = self.state().await;
        if state != ServiceWorkerState::Activated {
            return Err(ServiceWorkerError::InvalidState {
                operation: "handle fetch",
                state,
            });
        }

        Ok(self
            .router
            .read()
            .await
            .handle_request(request, EventKind::Fetch)
            .await?)
    }

    /// Run a message event.
    pub async fn dispatch_message(
        &self,
        data: &serde_json::Value,
    ) -> Result<MessageOutcome, ServiceWorkerError> {
        match WorkerMessage::from_json(data)? {
            WorkerMessage::CacheUrls(urls) => self.cache_urls(&urls).await,
            WorkerMessage::SkipWaiting => {
                self.skip_waiting();
                Ok(MessageOutcome::default())
            }
            WorkerMessage::Unknown(kind) => {
                debug!(kind = %kind, "Ignoring message");
                Ok(MessageOutcome::default())
            }
        }
    }

    /// Route every URL concurrently, letting matching routes cache it.
    async fn cache_urls(&self, urls: &[UrlToCache]) -> Result<MessageOutcome, ServiceWorkerError> {
        let requests = urls
            .iter()
            .map(|entry| entry.to_request(&self.location))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = requests.len(), "Caching URLs from message");

        let router = self.router.read().await;
        let results = join_all(requests.into_iter().map(|request| {
            let url = request.url.to_string();
            let router = &*router;
            async move { (url, router.handle_request(request, EventKind::Message).await) }
        }))
        .await;

        let mut outcome = MessageOutcome::default();
        for (url, result) in results {
            match result {
                Ok(Some(_)) => outcome.handled.push(url),
                Ok(None) => outcome.unmatched.push(url),
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to cache URL");
                    outcome.failed.push((url, e.to_string()));
                }
            }
        }
        Ok(outcome)
    }

    /// Ask the host to activate this worker without waiting.
    pub fn skip_waiting(&self) {
        if !self.skip_waiting.swap(true, Ordering::SeqCst) {
            info!(worker = self.id.as_u64(), "Skip waiting requested");
        }
    }

    pub fn is_skipping_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    async fn transition(
        &self,
        operation: &'static str,
        from: ServiceWorkerState,
        to: ServiceWorkerState,
    ) -> Result<(), ServiceWorkerError> {
        {
            let mut state = self.state.write().await;
            if *state != from {
                return Err(ServiceWorkerError::InvalidState {
                    operation,
                    state: *state,
                });
            }
            *state = to;
        }
        self.emit_state(to);
        Ok(())
    }

    async fn set_state(&self, state: ServiceWorkerState) {
        *self.state.write().await = state;
        self.emit_state(state);
    }

    fn emit_state(&self, new_state: ServiceWorkerState) {
        debug!(worker = self.id.as_u64(), state = ?new_state, "Worker state changed");
        let _ = self.event_tx.send(ServiceWorkerEvent::StateChange {
            worker_id: self.id,
            new_state,
        });
    }
}

impl std::fmt::Debug for ServiceWorkerGlobalScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorkerGlobalScope")
            .field("id", &self.id)
            .field("location", &self.location.as_str())
            .field("scope", &self.scope.as_str())
            .finish_non_exhaustive()
    }
}
