//! Worker scope errors.

use swkit_cache::CacheError;
use swkit_common::ConfigError;
use swkit_precache::PrecacheError;
use thiserror::Error;

use crate::state::ServiceWorkerState;

/// Errors raised by the worker scope.
#[derive(Error, Debug)]
pub enum ServiceWorkerError {
    #[error("Cannot {operation} while the worker is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: ServiceWorkerState,
    },

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error(transparent)]
    Precache(#[from] PrecacheError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ServiceWorkerError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceWorkerError::InvalidState { .. } => "invalid-state",
            ServiceWorkerError::InvalidMessage(_) => "invalid-message",
            ServiceWorkerError::InvalidUrl { .. } => "invalid-url",
            ServiceWorkerError::Precache(e) => e.kind(),
            ServiceWorkerError::Cache(CacheError::QuotaExceeded { .. }) => "quota-exceeded",
            ServiceWorkerError::Cache(_) => "cache-error",
            ServiceWorkerError::Config(_) => "invalid-config",
        }
    }
}
