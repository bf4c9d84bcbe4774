//! Relationship endpoint indices.
//!
//! A relationship's raw edge fact is not part of its attribute payload, so
//! cache operations alone do not reveal which relationships touch which
//! endpoints. This index records it explicitly: `outgoing[x]` holds every
//! relationship whose source endpoint is `x`, `incoming[x]` every
//! relationship whose target is `x`. The session layer keeps it in
//! lock-step with cache mutations for relationship-typed entities; the two
//! must never disagree about whether a relationship exists.

use std::collections::HashMap;
use stratum_core::{LinkSpec, Uri};

/// Outgoing/incoming relationship indices, keyed by endpoint URI.
#[derive(Debug, Default)]
pub struct RelationshipIndex {
    outgoing: HashMap<Uri, Vec<Uri>>,
    incoming: HashMap<Uri, Vec<Uri>>,
}

impl RelationshipIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a relationship against both its endpoints. Idempotent.
    pub fn record(&mut self, relationship: &Uri, link: &LinkSpec) {
        let out = self.outgoing.entry(link.source.clone()).or_default();
        if !out.contains(relationship) {
            out.push(relationship.clone());
        }
        let inc = self.incoming.entry(link.target.clone()).or_default();
        if !inc.contains(relationship) {
            inc.push(relationship.clone());
        }
    }

    /// Strip a relationship from both endpoint entries.
    pub fn remove(&mut self, relationship: &Uri, link: &LinkSpec) {
        if let Some(out) = self.outgoing.get_mut(&link.source) {
            out.retain(|r| r != relationship);
            if out.is_empty() {
                self.outgoing.remove(&link.source);
            }
        }
        if let Some(inc) = self.incoming.get_mut(&link.target) {
            inc.retain(|r| r != relationship);
            if inc.is_empty() {
                self.incoming.remove(&link.target);
            }
        }
    }

    /// Re-point both endpoint entries from one relationship URI to another.
    /// Used when a repair pass replaces a relationship under a new canonical
    /// URI.
    pub fn repoint(&mut self, old: &Uri, new: &Uri, link: &LinkSpec) {
        self.remove(old, link);
        self.record(new, link);
    }

    /// Drop every entry keyed by this endpoint, in both directions. Used
    /// when an endpoint entity is deleted; the relationships themselves are
    /// removed individually as they are deleted.
    pub fn remove_endpoint(&mut self, endpoint: &Uri) {
        self.outgoing.remove(endpoint);
        self.incoming.remove(endpoint);
    }

    /// Relationships whose source endpoint is `endpoint`.
    pub fn outgoing_of(&self, endpoint: &Uri) -> &[Uri] {
        self.outgoing.get(endpoint).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Relationships whose target endpoint is `endpoint`.
    pub fn incoming_of(&self, endpoint: &Uri) -> &[Uri] {
        self.incoming.get(endpoint).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any entry references this relationship.
    pub fn contains(&self, relationship: &Uri) -> bool {
        self.outgoing.values().any(|v| v.contains(relationship))
            || self.incoming.values().any(|v| v.contains(relationship))
    }

    /// Drop every index entry.
    pub fn clear(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
    }

    /// Total number of indexed (endpoint, relationship) pairs.
    pub fn len(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum::<usize>()
            + self.incoming.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && self.incoming.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn link() -> LinkSpec {
        LinkSpec::new("urn:a1", "urn:edge:connectedTo", "urn:a2")
    }

    #[test]
    fn test_record_indexes_both_directions() {
        let mut index = RelationshipIndex::new();
        let rel = Uri::new("urn:r1");
        index.record(&rel, &link());

        assert_eq!(index.outgoing_of(&Uri::new("urn:a1")), &[rel.clone()]);
        assert_eq!(index.incoming_of(&Uri::new("urn:a2")), &[rel.clone()]);
        assert!(index.outgoing_of(&Uri::new("urn:a2")).is_empty());
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut index = RelationshipIndex::new();
        let rel = Uri::new("urn:r1");
        index.record(&rel, &link());
        index.record(&rel, &link());
        assert_eq!(index.outgoing_of(&Uri::new("urn:a1")).len(), 1);
    }

    #[test]
    fn test_remove_strips_both_directions() {
        let mut index = RelationshipIndex::new();
        let rel = Uri::new("urn:r1");
        index.record(&rel, &link());
        index.remove(&rel, &link());

        assert!(index.outgoing_of(&Uri::new("urn:a1")).is_empty());
        assert!(index.incoming_of(&Uri::new("urn:a2")).is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_readd_after_remove_restores_entries() {
        let mut index = RelationshipIndex::new();
        let rel = Uri::new("urn:r1");
        index.record(&rel, &link());
        index.remove(&rel, &link());
        index.record(&rel, &link());

        assert_eq!(index.outgoing_of(&Uri::new("urn:a1")), &[rel.clone()]);
        assert_eq!(index.incoming_of(&Uri::new("urn:a2")), &[rel]);
    }

    #[test]
    fn test_remove_endpoint_drops_both_directions() {
        let mut index = RelationshipIndex::new();
        index.record(&Uri::new("urn:r1"), &link());
        index.record(
            &Uri::new("urn:r2"),
            &LinkSpec::new("urn:a3", "urn:edge:connectedTo", "urn:a1"),
        );
        index.remove_endpoint(&Uri::new("urn:a1"));

        assert!(index.outgoing_of(&Uri::new("urn:a1")).is_empty());
        assert!(index.incoming_of(&Uri::new("urn:a1")).is_empty());
        // Entries keyed by other endpoints are untouched.
        assert_eq!(index.outgoing_of(&Uri::new("urn:a3")).len(), 1);
    }

    #[test]
    fn test_repoint_moves_entries_to_new_uri() {
        let mut index = RelationshipIndex::new();
        let old = Uri::new("urn:r1");
        let new = Uri::new("urn:stratum:relation:connectedTo-abc");
        index.record(&old, &link());
        index.repoint(&old, &new, &link());

        assert!(!index.contains(&old));
        assert_eq!(index.outgoing_of(&Uri::new("urn:a1")), &[new.clone()]);
        assert_eq!(index.incoming_of(&Uri::new("urn:a2")), &[new]);
    }
}
