//! Precache manifest entries.
//!
//! The manifest is a JSON array whose elements are either a bare URL that
//! already embeds a content hash, or `{"url", "revision"?, "integrity"?}`.

use serde::{Deserialize, Serialize};

use crate::error::{PrecacheError, PrecacheResult};

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    /// A self-versioned URL.
    Url(String),
    /// A URL with optional revision and integrity metadata.
    Record(ManifestRecord),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRecord {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

impl ManifestEntry {
    /// Entry for a URL carrying its own version.
    pub fn url(url: impl Into<String>) -> Self {
        ManifestEntry::Url(url.into())
    }

    /// Entry whose version is tracked by `revision`.
    pub fn revisioned(url: impl Into<String>, revision: impl Into<String>) -> Self {
        ManifestEntry::Record(ManifestRecord {
            url: Some(url.into()),
            revision: Some(revision.into()),
            integrity: None,
        })
    }

    /// Attach integrity metadata, turning a bare URL into a record.
    pub fn with_integrity(self, integrity: impl Into<String>) -> Self {
        let mut record = match self {
            ManifestEntry::Url(url) => ManifestRecord {
                url: Some(url),
                ..Default::default()
            },
            ManifestEntry::Record(record) => record,
        };
        record.integrity = Some(integrity.into());
        ManifestEntry::Record(record)
    }

    /// The raw, unresolved URL, if any.
    pub fn raw_url(&self) -> Option<&str> {
        match self {
            ManifestEntry::Url(url) => Some(url.as_str()),
            ManifestEntry::Record(record) => record.url.as_deref(),
        }
    }

    /// The revision, if one was given and is non-empty.
    pub fn revision(&self) -> Option<&str> {
        match self {
            ManifestEntry::Url(_) => None,
            ManifestEntry::Record(record) => record.revision.as_deref().filter(|r| !r.is_empty()),
        }
    }

    /// The integrity metadata, if one was given and is non-empty.
    pub fn integrity(&self) -> Option<&str> {
        match self {
            ManifestEntry::Url(_) => None,
            ManifestEntry::Record(record) => {
                record.integrity.as_deref().filter(|i| !i.is_empty())
            }
        }
    }
}

impl From<&str> for ManifestEntry {
    fn from(url: &str) -> Self {
        ManifestEntry::url(url)
    }
}

/// A parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    /// Parse the JSON form. `null` and empty-string elements are rejected
    /// with their index.
    pub fn from_json(json: &str) -> PrecacheResult<Self> {
        let raw: Vec<Option<ManifestEntry>> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                None => Err(PrecacheError::InvalidEntry {
                    entry: "null".to_string(),
                    reason: format!("element {index} is null"),
                }),
                Some(ManifestEntry::Url(url)) if url.is_empty() => {
                    Err(PrecacheError::InvalidEntry {
                        entry: "\"\"".to_string(),
                        reason: format!("element {index} is an empty URL"),
                    })
                }
                Some(entry) => Ok(entry),
            })
            .collect::<PrecacheResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<ManifestEntry>> for Manifest {
    fn from(entries: Vec<ManifestEntry>) -> Self {
        Self::new(entries)
    }
}
