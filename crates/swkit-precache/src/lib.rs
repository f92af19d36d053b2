//! # SwKit Precache
//!
//! Precaching for SwKit service workers: a versioned manifest of assets is
//! fetched into a dedicated cache during install, served from it afterwards,
//! and reconciled against the manifest on activate.
//!
//! ## Features
//!
//! - Revision-keyed cache keys (`?__WB_REVISION__=<rev>`)
//! - Manifest registry with conflict detection
//! - Install/activate lifecycle with updated/deleted URL reports
//! - Runtime network fallback with integrity-gated cache repair
//! - URL-variation request matching (ignored params, directory index, clean URLs)
//! - Typed plugin hooks and a precached offline fallback
//!
//! ## Example
//!
//! ```ignore
//! let controller = Arc::new(PrecacheController::new(host, PrecacheControllerOptions::default()));
//! controller.add_to_cache_list(Manifest::from_json(MANIFEST)?.entries())?;
//! controller.install().await?;
//! controller.activate().await?;
//!
//! let options = InterceptOptions::from_settings(&routing)?;
//! let interceptor = RequestInterceptor::new(controller, options);
//! if let Some(outcome) = interceptor.handle(request).await? {
//!     respond(outcome.response);
//! }
//! ```

pub mod cache_key;
pub mod cleanup;
pub mod controller;
pub mod error;
pub mod fallback;
pub mod intercept;
pub mod manifest;
pub mod plugin;
pub mod registry;
pub mod strategy;

pub use cache_key::{derive_cache_key, CacheKey, REVISION_SEARCH_PARAM};
pub use cleanup::delete_outdated_caches;
pub use controller::{
    BoundHandler, CleanupResult, InstallResult, PrecacheCacheKeyPlugin, PrecacheController,
    PrecacheControllerOptions, PrecacheHost,
};
pub use error::{PrecacheError, PrecacheResult};
pub use fallback::PrecacheFallbackPlugin;
pub use intercept::{
    compile_patterns, generate_url_variations, InterceptMatch, InterceptOptions,
    RequestInterceptor,
};
pub use manifest::{Manifest, ManifestEntry, ManifestRecord};
pub use plugin::{CacheKeyMode, EventKind, HandlerContext, Plugin, PluginSet};
pub use registry::{ManifestRegistry, RegisterReport};
pub use strategy::{HandleOutcome, PrecacheStrategy, PrecacheStrategyOptions, ResponseSource};
