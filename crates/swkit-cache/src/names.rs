//! Cache names.
//!
//! Generated names follow `<prefix>-<purpose>-<suffix>`, skipping empty
//! parts. The suffix defaults to the worker's registration scope so that
//! workers for different scopes on one origin never share a cache.

use swkit_common::CacheNameSettings;
use url::Url;

use crate::CacheError;

/// The parts cache names are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNameDetails {
    pub prefix: String,
    pub suffix: String,
    pub precache: String,
    pub runtime: String,
}

impl CacheNameDetails {
    /// Defaults for a worker registered at `scope`.
    pub fn for_scope(scope: &Url) -> Self {
        Self {
            prefix: "workbox".to_string(),
            suffix: scope.to_string(),
            precache: "precache-v2".to_string(),
            runtime: "runtime".to_string(),
        }
    }
}

/// Cache name generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    details: CacheNameDetails,
}

impl CacheNames {
    pub fn new(scope: &Url) -> Self {
        Self {
            details: CacheNameDetails::for_scope(scope),
        }
    }

    /// Build names for `scope` with configured overrides applied.
    pub fn with_settings(scope: &Url, settings: &CacheNameSettings) -> Result<Self, CacheError> {
        let mut names = Self::new(scope);
        names.set_details(settings)?;
        Ok(names)
    }

    /// Override the given parts. Every provided part must be non-empty; on
    /// error nothing is changed.
    pub fn set_details(&mut self, settings: &CacheNameSettings) -> Result<(), CacheError> {
        let overrides = [
            ("prefix", &settings.prefix),
            ("suffix", &settings.suffix),
            ("precache", &settings.precache),
            ("runtime", &settings.runtime),
        ];
        for (field, value) in overrides {
            if matches!(value, Some(v) if v.is_empty()) {
                return Err(CacheError::InvalidCacheName(field));
            }
        }

        let details = &mut self.details;
        for (slot, value) in [
            (&mut details.prefix, &settings.prefix),
            (&mut details.suffix, &settings.suffix),
            (&mut details.precache, &settings.precache),
            (&mut details.runtime, &settings.runtime),
        ] {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }
        Ok(())
    }

    pub fn details(&self) -> &CacheNameDetails {
        &self.details
    }

    fn create(&self, purpose: &str) -> String {
        [
            self.details.prefix.as_str(),
            purpose,
            self.details.suffix.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
    }

    /// Name of the precache.
    pub fn precache(&self) -> String {
        self.create(&self.details.precache)
    }

    /// Name of the runtime cache.
    pub fn runtime(&self) -> String {
        self.create(&self.details.runtime)
    }

    /// `user_cache_name` if given, the generated precache name otherwise.
    pub fn precache_name(&self, user_cache_name: Option<&str>) -> String {
        match user_cache_name {
            Some(name) => name.to_string(),
            None => self.precache(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.details.suffix
    }
}
