//! Inherited default-setting resolution.
//!
//! A default setting (a control, a trustworthiness attribute, a
//! misbehaviour) is declared against an ontology type and inherited by its
//! subtypes. Resolution tries the exact type first, then each direct
//! supertype recursively; the first match wins. When a type has several
//! direct supertypes that each declare a setting, the one in supertype
//! declaration order wins - that tie-break is unspecified behaviour and
//! nothing should rely on it.

use crate::hierarchy::TypeHierarchy;
use std::collections::{HashMap, HashSet};
use stratum_core::{SettingKind, Uri};
use stratum_store::DefaultSettingRecord;

/// Precomputed `type -> kind -> setting` map with hierarchy fallback.
#[derive(Debug, Default)]
pub struct DefaultSettingResolver {
    by_type: HashMap<Uri, HashMap<SettingKind, Uri>>,
}

impl DefaultSettingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from schema-scan records.
    pub fn from_records(records: impl IntoIterator<Item = DefaultSettingRecord>) -> Self {
        let mut resolver = Self::new();
        for record in records {
            resolver.insert(record.type_uri, record.kind, record.setting);
        }
        resolver
    }

    /// Declare a default setting for a type.
    pub fn insert(&mut self, type_uri: Uri, kind: SettingKind, setting: Uri) {
        self.by_type.entry(type_uri).or_default().insert(kind, setting);
    }

    /// Resolve the setting for `type_uri`, walking supertypes on a miss.
    ///
    /// Returns `None` when the hierarchy is exhausted without a match.
    pub fn resolve(
        &self,
        hierarchy: &TypeHierarchy,
        type_uri: &Uri,
        kind: SettingKind,
    ) -> Option<&Uri> {
        let mut visited = HashSet::new();
        self.resolve_inner(hierarchy, type_uri, kind, &mut visited)
    }

    fn resolve_inner<'a>(
        &'a self,
        hierarchy: &TypeHierarchy,
        type_uri: &Uri,
        kind: SettingKind,
        visited: &mut HashSet<Uri>,
    ) -> Option<&'a Uri> {
        if !visited.insert(type_uri.clone()) {
            return None;
        }
        if let Some(setting) = self.by_type.get(type_uri).and_then(|m| m.get(&kind)) {
            return Some(setting);
        }
        for sup in hierarchy.supertypes_of(type_uri) {
            if let Some(setting) = self.resolve_inner(hierarchy, sup, kind, visited) {
                return Some(setting);
            }
        }
        None
    }
}

// =============================================================================
// TESTS
// =============================================================================
