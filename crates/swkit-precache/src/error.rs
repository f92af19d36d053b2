//! Error types for precaching

use swkit_cache::CacheError;
use swkit_common::ConfigError;
use swkit_net::NetError;
use thiserror::Error;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// Precache failures. Each variant carries the details needed to diagnose it
/// and maps to a stable code via [`PrecacheError::kind`].
#[derive(Error, Debug)]
pub enum PrecacheError {
    #[error("Invalid manifest entry {entry}: {reason}")]
    InvalidEntry { entry: String, reason: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(#[from] serde_json::Error),

    #[error(
        "Conflicting entries for {url}: already registered as {first_cache_key}, \
         now {second_cache_key}"
    )]
    ConflictingEntry {
        url: String,
        first_cache_key: String,
        second_cache_key: String,
    },

    #[error("Conflicting integrity values for {cache_key}: {first} and {second}")]
    ConflictingIntegrity {
        cache_key: String,
        first: String,
        second: String,
    },

    #[error("Bad precaching response for {url} (status {})", fmt_status(.status))]
    BadPrecachingResponse { url: String, status: Option<u16> },

    #[error("Missing precache entry for {url} in {cache_name}")]
    MissingPrecacheEntry { cache_name: String, url: String },

    #[error("{url} is not in the precache manifest")]
    NonPrecachedUrl { url: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

impl PrecacheError {
    /// Machine-readable error code.
    pub fn kind(&self) -> &'static str {
        match self {
            PrecacheError::InvalidEntry { .. } => "invalid-entry",
            PrecacheError::InvalidManifest(_) => "invalid-manifest",
            PrecacheError::ConflictingEntry { .. } => "conflicting-entry",
            PrecacheError::ConflictingIntegrity { .. } => "conflicting-integrity",
            PrecacheError::BadPrecachingResponse { .. } => "bad-precaching-response",
            PrecacheError::MissingPrecacheEntry { .. } => "missing-precache-entry",
            PrecacheError::NonPrecachedUrl { .. } => "non-precached-url",
            PrecacheError::InvalidUrl { .. } => "invalid-url",
            PrecacheError::Net(_) => "network-error",
            PrecacheError::Cache(CacheError::QuotaExceeded { .. }) => "quota-exceeded",
            PrecacheError::Cache(CacheError::NonGetRequest(_)) => "non-get-request",
            PrecacheError::Cache(CacheError::InvalidCacheName(_)) => "invalid-cache-name",
            PrecacheError::Cache(_) => "cache-error",
            PrecacheError::Config(_) => "invalid-config",
        }
    }

    /// Whether this error blocks the next worker version from activating.
    pub fn is_fatal_to_install(&self) -> bool {
        !matches!(self, PrecacheError::MissingPrecacheEntry { .. })
    }

    pub(crate) fn invalid_url(url: &str, err: impl std::fmt::Display) -> Self {
        PrecacheError::InvalidUrl {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
