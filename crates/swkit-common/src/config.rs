//! Worker configuration
//!
//! The build step that generates the worker injects these values once at
//! startup, usually as a JSON document next to the precache manifest.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::LogFormat;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("`{field}` must not be empty")]
    EmptyValue { field: &'static str },

    #[error("Invalid pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Top-level worker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Overrides for the generated cache names
    pub cache_names: CacheNameSettings,

    /// Precache controller options
    pub precache: PrecacheSettings,

    /// URL matching options for precached routes
    pub routing: RoutingSettings,

    /// Serve one precached page for unmatched navigations
    pub navigation_fallback: Option<NavigationFallbackSettings>,

    /// Logging
    pub log: LogSettings,
}

/// Parts of `<prefix>-<purpose>-<suffix>` cache names. Unset parts keep
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheNameSettings {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub precache: Option<String>,
    pub runtime: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecacheSettings {
    /// Full cache name, bypassing the generated one
    pub cache_name: Option<String>,

    /// Fetch from the network when a precached entry is missing
    pub fallback_to_network: bool,

    /// Delete precaches left behind by older cache-name schemes on activate
    pub cleanup_outdated_caches: bool,

    /// Precached URL served when a routed request fails
    pub offline_fallback_url: Option<String>,
}

impl Default for PrecacheSettings {
    fn default() -> Self {
        Self {
            cache_name: None,
            fallback_to_network: true,
            cleanup_outdated_caches: false,
            offline_fallback_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// Appended to URLs ending in `/`. `null` disables the variation.
    pub directory_index: Option<String>,

    /// Try `<path>.html` as well
    pub clean_urls: bool,

    /// Regex sources for query parameters stripped before matching
    pub ignore_url_parameters_matching: Vec<String>,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            directory_index: Some("index.html".to_string()),
            clean_urls: true,
            ignore_url_parameters_matching: vec!["^utm_".to_string(), "^fbclid$".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationFallbackSettings {
    /// Precached URL served for matching navigations
    pub url: String,

    /// Regex sources; when non-empty a path must match one of them
    pub allowlist: Vec<String>,

    /// Regex sources; a matching path is never handled
    pub denylist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
    pub filter: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            filter: None,
        }
    }
}

impl WorkerConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WorkerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject empty overrides; an empty part would silently change the
    /// generated cache name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = &self.cache_names;
        let overrides = [
            ("cache_names.prefix", &names.prefix),
            ("cache_names.suffix", &names.suffix),
            ("cache_names.precache", &names.precache),
            ("cache_names.runtime", &names.runtime),
            ("precache.cache_name", &self.precache.cache_name),
            ("precache.offline_fallback_url", &self.precache.offline_fallback_url),
            ("routing.directory_index", &self.routing.directory_index),
        ];
        for (field, value) in overrides {
            if matches!(value, Some(v) if v.is_empty()) {
                return Err(ConfigError::EmptyValue { field });
            }
        }

        if let Some(ref fallback) = self.navigation_fallback {
            if fallback.url.is_empty() {
                return Err(ConfigError::EmptyValue {
                    field: "navigation_fallback.url",
                });
            }
        }

        Ok(())
    }
}
