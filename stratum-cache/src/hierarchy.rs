//! Type hierarchy index.
//!
//! Built once per session from subtype/subproperty declarations in the
//! schema partition. Two adjacency maps answer ancestor and descendant
//! queries by breadth-first traversal; schema graphs are expected to be
//! acyclic, but traversal is bounded by a visited set so an accidental
//! cycle cannot loop forever.

use std::collections::{HashMap, HashSet, VecDeque};
use stratum_core::Uri;

/// Subtype/supertype adjacency maps with BFS queries.
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    supers: HashMap<Uri, Vec<Uri>>,
    subs: HashMap<Uri, Vec<Uri>>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (subtype, supertype) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Uri, Uri)>) -> Self {
        let mut hierarchy = Self::new();
        for (sub, sup) in pairs {
            hierarchy.insert(sub, sup);
        }
        hierarchy
    }

    /// Declare `sub` a direct subtype of `sup`. Idempotent.
    pub fn insert(&mut self, sub: Uri, sup: Uri) {
        let ups = self.supers.entry(sub.clone()).or_default();
        if !ups.contains(&sup) {
            ups.push(sup.clone());
        }
        let downs = self.subs.entry(sup).or_default();
        if !downs.contains(&sub) {
            downs.push(sub);
        }
    }

    /// Direct supertypes, in declaration order.
    pub fn supertypes_of(&self, type_uri: &Uri) -> &[Uri] {
        self.supers.get(type_uri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct subtypes, in declaration order.
    pub fn subtypes_of(&self, type_uri: &Uri) -> &[Uri] {
        self.subs.get(type_uri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All transitive supertypes, breadth-first.
    pub fn ancestors_of(&self, type_uri: &Uri, include_self: bool) -> Vec<Uri> {
        Self::walk(&self.supers, type_uri, include_self)
    }

    /// All transitive subtypes, breadth-first.
    pub fn descendants_of(&self, type_uri: &Uri, include_self: bool) -> Vec<Uri> {
        Self::walk(&self.subs, type_uri, include_self)
    }

    fn walk(adjacency: &HashMap<Uri, Vec<Uri>>, start: &Uri, include_self: bool) -> Vec<Uri> {
        let mut visited: HashSet<Uri> = HashSet::new();
        let mut order: Vec<Uri> = Vec::new();
        let mut queue: VecDeque<Uri> = VecDeque::new();

        visited.insert(start.clone());
        if include_self {
            order.push(start.clone());
        }
        queue.push_back(start.clone());

        while let Some(current) = queue.pop_front() {
            for next in adjacency.get(&current).into_iter().flatten() {
                if visited.insert(next.clone()) {
                    order.push(next.clone());
                    queue.push_back(next.clone());
                }
            }
        }
        order
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        Uri::new(s)
    }

    /// Host -> Server -> Asset, Router -> Asset
    fn sample() -> TypeHierarchy {
        TypeHierarchy::from_pairs(vec![
            (uri("t:Host"), uri("t:Server")),
            (uri("t:Server"), uri("t:Asset")),
            (uri("t:Router"), uri("t:Asset")),
        ])
    }

    #[test]
    fn test_ancestors_breadth_first() {
        let h = sample();
        assert_eq!(
            h.ancestors_of(&uri("t:Host"), false),
            vec![uri("t:Server"), uri("t:Asset")]
        );
        assert_eq!(
            h.ancestors_of(&uri("t:Host"), true),
            vec![uri("t:Host"), uri("t:Server"), uri("t:Asset")]
        );
    }

    #[test]
    fn test_descendants() {
        let h = sample();
        let downs = h.descendants_of(&uri("t:Asset"), false);
        assert_eq!(downs.len(), 3);
        assert!(downs.contains(&uri("t:Server")));
        assert!(downs.contains(&uri("t:Router")));
        assert!(downs.contains(&uri("t:Host")));
    }

    #[test]
    fn test_unknown_type_yields_self_only() {
        let h = sample();
        assert!(h.ancestors_of(&uri("t:Nothing"), false).is_empty());
        assert_eq!(h.ancestors_of(&uri("t:Nothing"), true), vec![uri("t:Nothing")]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut h = TypeHierarchy::new();
        h.insert(uri("t:A"), uri("t:B"));
        h.insert(uri("t:B"), uri("t:C"));
        h.insert(uri("t:C"), uri("t:A"));

        let ancestors = h.ancestors_of(&uri("t:A"), false);
        assert_eq!(ancestors, vec![uri("t:B"), uri("t:C")]);
        let descendants = h.descendants_of(&uri("t:A"), true);
        assert_eq!(descendants.len(), 3);
    }

    #[test]
    fn test_duplicate_insert_ignored() {
        let mut h = TypeHierarchy::new();
        h.insert(uri("t:A"), uri("t:B"));
        h.insert(uri("t:A"), uri("t:B"));
        assert_eq!(h.supertypes_of(&uri("t:A")).len(), 1);
        assert_eq!(h.subtypes_of(&uri("t:B")).len(), 1);
    }
}
