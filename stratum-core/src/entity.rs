//! Entity payloads and shared handles.
//!
//! Entities are opaque attribute bags to the cache: a stable URI, an
//! ontology type URI, and a JSON attribute map. Relationship entities carry
//! a `LinkSpec` describing the raw edge fact they are dual-represented by.
//!
//! The cache never deep-copies. `Entity` is a shared-ownership mutable cell:
//! callers mutate a fetched handle in place, and a later `stage` call on the
//! same handle persists those mutations.

use crate::uri::Uri;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};

/// The raw directed-edge fact a relationship entity encodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkSpec {
    /// Source endpoint entity.
    pub source: Uri,
    /// Edge type (an ontology property URI).
    pub edge_type: Uri,
    /// Target endpoint entity.
    pub target: Uri,
}

impl LinkSpec {
    pub fn new(source: impl Into<Uri>, edge_type: impl Into<Uri>, target: impl Into<Uri>) -> Self {
        Self {
            source: source.into(),
            edge_type: edge_type.into(),
            target: target.into(),
        }
    }
}

/// Entity payload: identity plus an opaque attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    /// Stable entity URI, unique within a partition set.
    pub uri: Uri,
    /// Concrete ontology type of the entity (not the cache type key).
    pub type_uri: Uri,
    /// Domain attributes; opaque to the cache and sync engine.
    pub attributes: Map<String, Value>,
    /// Present on relationship entities only.
    pub link: Option<LinkSpec>,
}

impl EntityData {
    /// Create a payload with an empty attribute bag.
    pub fn new(uri: impl Into<Uri>, type_uri: impl Into<Uri>) -> Self {
        Self {
            uri: uri.into(),
            type_uri: type_uri.into(),
            attributes: Map::new(),
            link: None,
        }
    }

    /// Set an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Attach the raw edge fact for a relationship entity.
    pub fn with_link(mut self, link: LinkSpec) -> Self {
        self.link = Some(link);
        self
    }

    /// Attribute accessor.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Shared mutable handle to an entity payload.
///
/// Cache and caller hold clones of the same `Arc`; mutations through one
/// handle are visible through every other.
pub type Entity = Arc<RwLock<EntityData>>;

/// Wrap a payload into a shared handle.
pub fn new_entity(data: EntityData) -> Entity {
    Arc::new(RwLock::new(data))
}

// =============================================================================
// TESTS
// =============================================================================
