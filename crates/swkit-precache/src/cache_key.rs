//! Cache keys for manifest entries.
//!
//! An entry with a revision is stored under its URL plus a reserved query
//! parameter carrying the revision, so a new revision never reuses the old
//! cache slot. Entries without a revision are stored under their URL.

use url::Url;

use crate::error::{PrecacheError, PrecacheResult};
use crate::manifest::ManifestEntry;

/// Query parameter that carries an entry's revision in its cache key.
pub const REVISION_SEARCH_PARAM: &str = "__WB_REVISION__";

/// The logical URL of an entry and the key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    /// Absolute key used in the precache.
    pub cache_key: String,
    /// Absolute logical URL.
    pub url: String,
}

/// Resolve a possibly relative URL against the worker location.
pub fn resolve_url(url: &str, base: &Url) -> PrecacheResult<Url> {
    base.join(url)
        .map_err(|e| PrecacheError::invalid_url(url, e))
}

/// Derive the cache key for an entry. Pure; `base` is the worker location.
pub fn derive_cache_key(entry: &ManifestEntry, base: &Url) -> PrecacheResult<CacheKey> {
    let raw = match entry.raw_url() {
        Some(url) if !url.is_empty() => url,
        _ => {
            return Err(PrecacheError::InvalidEntry {
                entry: format!("{entry:?}"),
                reason: "entry has no url".to_string(),
            })
        }
    };

    let url = resolve_url(raw, base)?;

    let Some(revision) = entry.revision() else {
        return Ok(CacheKey {
            cache_key: url.to_string(),
            url: url.to_string(),
        });
    };

    Ok(CacheKey {
        cache_key: with_revision(&url, revision).to_string(),
        url: url.to_string(),
    })
}

/// Set the revision parameter, replacing any previous value.
fn with_revision(url: &Url, revision: &str) -> Url {
    let mut keyed = url.clone();
    let has_param = url.query_pairs().any(|(name, _)| name == REVISION_SEARCH_PARAM);

    if has_param {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| name != REVISION_SEARCH_PARAM)
            .map(|(n, v)| (n.into_owned(), v.into_owned()))
            .collect();
        keyed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(REVISION_SEARCH_PARAM, revision);
    } else {
        keyed
            .query_pairs_mut()
            .append_pair(REVISION_SEARCH_PARAM, revision);
    }
    keyed
}
