//! Subresource integrity metadata.
//!
//! Metadata is a space-separated list of `<alg>-<base64 digest>[?options]`
//! tokens. Only the strongest supported algorithm present is checked, and a
//! body passes when it matches any digest of that algorithm.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Supported hash algorithms, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    fn digest(&self, body: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(body).to_vec(),
            Self::Sha384 => Sha384::digest(body).to_vec(),
            Self::Sha512 => Sha512::digest(body).to_vec(),
        }
    }
}

/// One parsed `<alg>-<digest>` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityHash {
    pub algorithm: Algorithm,
    pub digest: String,
}

/// Parse integrity metadata, skipping tokens with unknown algorithms.
pub fn parse(metadata: &str) -> Vec<IntegrityHash> {
    metadata
        .split_ascii_whitespace()
        .filter_map(|token| {
            let (alg, rest) = token.split_once('-')?;
            let algorithm = Algorithm::from_prefix(alg)?;
            let digest = rest.split('?').next().unwrap_or_default();
            if digest.is_empty() {
                return None;
            }
            Some(IntegrityHash {
                algorithm,
                digest: digest.to_string(),
            })
        })
        .collect()
}

/// Check a body against integrity metadata. Metadata without any supported
/// hash is treated as satisfied.
pub fn verify(metadata: &str, body: &[u8]) -> bool {
    let hashes = parse(metadata);
    let Some(strongest) = hashes.iter().map(|h| h.algorithm).max() else {
        return true;
    };

    let actual = STANDARD.encode(strongest.digest(body));
    hashes
        .iter()
        .filter(|h| h.algorithm == strongest)
        .any(|h| h.digest == actual)
}

/// Compute the metadata string for a body.
pub fn compute(algorithm: Algorithm, body: &[u8]) -> String {
    format!(
        "{}-{}",
        algorithm.prefix(),
        STANDARD.encode(algorithm.digest(body))
    )
}
