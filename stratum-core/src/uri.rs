//! URI identity type and the canonical relationship URI digest.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;

/// Entity identifier: a URI string, unique within a partition set.
///
/// Plain newtype over `String`. URIs are map keys throughout the cache, so
/// the type is hashable and ordered; it is not interned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    /// Create a URI from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fragment part of the URI (after the last `#`), or the whole string
    /// when there is no fragment.
    pub fn fragment(&self) -> &str {
        match self.0.rfind('#') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Uri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for Uri {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Canonical URI for a relationship entity.
///
/// A relationship's identity is a deterministic function of its endpoints
/// and edge type. Repair passes recompute this value and replace any
/// relationship whose stored URI disagrees with it.
pub fn canonical_relationship_uri(source: &Uri, edge_type: &Uri, target: &Uri) -> Uri {
    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(edge_type.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(target.as_str().as_bytes());
    let digest = hasher.finalize();
    Uri::new(format!(
        "urn:stratum:relation:{}-{}",
        edge_type.fragment(),
        hex::encode(&digest[..12])
    ))
}

// =============================================================================
// TESTS
// =============================================================================
