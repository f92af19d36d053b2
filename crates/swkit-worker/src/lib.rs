//! # SwKit Worker
//!
//! The service worker global scope: lifecycle events, fetch routing and
//! page messages for a worker that serves a precached site offline.
//!
//! ## Features
//!
//! - **Lifecycle**: install, activate and their state transitions
//! - **Routing**: precached URLs, SPA navigation fallback, offline fallback
//! - **Messages**: `CACHE_URLS`, `SKIP_WAITING`
//! - **Events**: state changes and install/activate reports over a channel
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorkerGlobalScope
//!     ├── PrecacheController (created on first use)
//!     │       ├── ManifestRegistry
//!     │       └── PrecacheStrategy ──► CacheStorage / Fetcher
//!     └── Router
//!             ├── Route::Precache (RequestInterceptor)
//!             ├── Route::Navigation (NavigationRoute)
//!             └── catch handler (PrecacheFallbackPlugin)
//! ```

pub mod error;
pub mod message;
pub mod navigation;
pub mod router;
pub mod scope;
pub mod state;

pub use error::ServiceWorkerError;
pub use message::{RequestInit, UrlToCache, WorkerMessage};
pub use navigation::NavigationRoute;
pub use router::{Route, Router};
pub use scope::{MessageOutcome, ServiceWorkerGlobalScope, WorkerHost};
pub use state::{ServiceWorkerEvent, ServiceWorkerId, ServiceWorkerState};
