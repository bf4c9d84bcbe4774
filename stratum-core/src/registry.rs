//! Cache type keys and the type registry.
//!
//! The registry replaces runtime name inspection with a closed enumeration:
//! every domain kind maps to a cache type key once, at registration, and the
//! static table records each key's entity kind and legal partition residency.

use crate::partition::PartitionSet;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Cache type key: the closed set of keys the cache partitions entities by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKey {
    Asset,
    Relation,
    Control,
    ControlSet,
    Misbehaviour,
    MisbehaviourSet,
    TrustAttribute,
    TrustAttributeSet,
    TrustImpactSet,
    Threat,
    ComplianceSet,
    ModelInfo,
}

impl TypeKey {
    /// Every cache type key, in a stable order.
    pub const ALL: [TypeKey; 12] = [
        TypeKey::Asset,
        TypeKey::Relation,
        TypeKey::Control,
        TypeKey::ControlSet,
        TypeKey::Misbehaviour,
        TypeKey::MisbehaviourSet,
        TypeKey::TrustAttribute,
        TypeKey::TrustAttributeSet,
        TypeKey::TrustImpactSet,
        TypeKey::Threat,
        TypeKey::ComplianceSet,
        TypeKey::ModelInfo,
    ];

    /// Stable name, used in log output and store graph labels.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKey::Asset => "asset",
            TypeKey::Relation => "relation",
            TypeKey::Control => "control",
            TypeKey::ControlSet => "control_set",
            TypeKey::Misbehaviour => "misbehaviour",
            TypeKey::MisbehaviourSet => "misbehaviour_set",
            TypeKey::TrustAttribute => "trust_attribute",
            TypeKey::TrustAttributeSet => "trust_attribute_set",
            TypeKey::TrustImpactSet => "trust_impact_set",
            TypeKey::Threat => "threat",
            TypeKey::ComplianceSet => "compliance_set",
            TypeKey::ModelInfo => "model_info",
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete domain kinds, one per entity class the business layer handles.
///
/// More than one domain kind may share a cache type key: primary and
/// compliance threats are distinct classes to the business layer but live
/// under the single `Threat` key in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainKind {
    Asset,
    Relation,
    Control,
    ControlSet,
    Misbehaviour,
    MisbehaviourSet,
    TrustAttribute,
    TrustAttributeSet,
    TrustImpactSet,
    PrimaryThreat,
    ComplianceThreat,
    ComplianceSet,
    ModelInfo,
}

impl DomainKind {
    /// Cache type key for this domain kind.
    pub fn cache_key(self) -> TypeKey {
        match self {
            DomainKind::Asset => TypeKey::Asset,
            DomainKind::Relation => TypeKey::Relation,
            DomainKind::Control => TypeKey::Control,
            DomainKind::ControlSet => TypeKey::ControlSet,
            DomainKind::Misbehaviour => TypeKey::Misbehaviour,
            DomainKind::MisbehaviourSet => TypeKey::MisbehaviourSet,
            DomainKind::TrustAttribute => TypeKey::TrustAttribute,
            DomainKind::TrustAttributeSet => TypeKey::TrustAttributeSet,
            DomainKind::TrustImpactSet => TypeKey::TrustImpactSet,
            // Both threat classes share one cache key.
            DomainKind::PrimaryThreat | DomainKind::ComplianceThreat => TypeKey::Threat,
            DomainKind::ComplianceSet => TypeKey::ComplianceSet,
            DomainKind::ModelInfo => TypeKey::ModelInfo,
        }
    }
}

/// Structural role of an entity, decided once at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Asset-like entity that relationship edges point at.
    Endpoint,
    /// Directed-edge entity, dual-represented as resource plus raw edge fact.
    Relationship,
    /// Everything else.
    Plain,
}

/// Kind of inheritable default setting resolved through the type hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettingKind {
    Control,
    TrustAttribute,
    Misbehaviour,
}

#[derive(Debug, Clone, Copy)]
struct TypeSpec {
    kind: EntityKind,
    residency: PartitionSet,
}

static TABLE: Lazy<HashMap<TypeKey, TypeSpec>> = Lazy::new(|| {
    use TypeKey::*;
    let mut table = HashMap::new();
    let mut put = |key: TypeKey, kind: EntityKind, residency: PartitionSet| {
        table.insert(key, TypeSpec { kind, residency });
    };
    put(Asset, EntityKind::Endpoint, PartitionSet::SYSTEM);
    put(Relation, EntityKind::Relationship, PartitionSet::SYSTEM);
    put(
        Control,
        EntityKind::Plain,
        PartitionSet::ASSERTED.union(PartitionSet::INFERRED),
    );
    put(
        ControlSet,
        EntityKind::Plain,
        PartitionSet::ASSERTED.union(PartitionSet::INFERRED),
    );
    put(Misbehaviour, EntityKind::Plain, PartitionSet::INFERRED);
    put(
        MisbehaviourSet,
        EntityKind::Plain,
        PartitionSet::ASSERTED.union(PartitionSet::INFERRED),
    );
    put(
        TrustAttribute,
        EntityKind::Plain,
        PartitionSet::ASSERTED.union(PartitionSet::INFERRED),
    );
    put(
        TrustAttributeSet,
        EntityKind::Plain,
        PartitionSet::ASSERTED.union(PartitionSet::INFERRED),
    );
    put(TrustImpactSet, EntityKind::Plain, PartitionSet::INFERRED);
    put(Threat, EntityKind::Plain, PartitionSet::INFERRED);
    put(ComplianceSet, EntityKind::Plain, PartitionSet::INFERRED);
    put(ModelInfo, EntityKind::Plain, PartitionSet::META);
    table
});

/// Static lookup over the type table.
pub struct TypeRegistry;

impl TypeRegistry {
    /// Structural role of entities cached under `key`.
    pub fn kind_of(key: TypeKey) -> EntityKind {
        TABLE[&key].kind
    }

    /// Partitions entities of this type may legally reside in.
    pub fn residency(key: TypeKey) -> PartitionSet {
        TABLE[&key].residency
    }

    /// Whether `key` may reside in `partition` per the residency table.
    pub fn resides_in(key: TypeKey, partition: crate::partition::Partition) -> bool {
        Self::residency(key).contains(partition.flag())
    }
}

// =============================================================================
// TESTS
// =============================================================================
