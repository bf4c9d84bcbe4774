//! Consistency repair over cached relationships.
//!
//! Legacy and partially-migrated models leave two kinds of damage behind:
//! directly-asserted cardinality values shadowing the computed ones, and
//! relationship URIs that no longer match the canonical function of their
//! endpoints. Both passes operate on the cache and stage their corrections,
//! so the store is fixed on the next sync.

use crate::cache::EntityCache;
use crate::relindex::RelationshipIndex;
use stratum_core::{
    canonical_relationship_uri, new_entity, CacheError, Entity, EntityData, Partition,
    StratumResult, TypeKey, Uri,
};
use tracing::debug;

/// Attribute keys holding directly-asserted (non-computed) cardinality.
pub const ASSERTED_CARDINALITY_KEYS: [&str; 2] =
    ["asserted_source_cardinality", "asserted_target_cardinality"];

/// Strip directly-asserted cardinality values from cached relationships so
/// only the computed population-derived values survive. Modified entities
/// are re-staged into the partition they were found in.
///
/// Returns the number of relationships modified.
pub fn strip_asserted_cardinality(
    cache: &mut EntityCache,
    partitions: &[Partition],
) -> StratumResult<usize> {
    let mut modified = 0;
    for &partition in partitions {
        let relations = cache.get_all(TypeKey::Relation, &[partition]);
        for relation in relations {
            let mut changed = false;
            {
                let mut guard = relation
                    .write()
                    .map_err(|_| CacheError::LockPoisoned)?;
                for key in ASSERTED_CARDINALITY_KEYS {
                    if guard.attributes.remove(key).is_some() {
                        changed = true;
                    }
                }
            }
            if changed {
                cache.stage(&relation, TypeKey::Relation, partition)?;
                modified += 1;
            }
        }
    }
    if modified > 0 {
        debug!(modified, "stripped asserted cardinality values");
    }
    Ok(modified)
}

/// Recompute each cached relationship's canonical URI; any relationship
/// whose URI disagrees is replaced - the old entity is evicted (staging its
/// deletion), a new entity is staged under the canonical URI, and both index
/// maps are re-pointed. Never renames in place.
///
/// Returns the (old, new) URI pairs that were replaced.
pub fn canonicalize_relationship_uris(
    cache: &mut EntityCache,
    index: &mut RelationshipIndex,
    partition: Partition,
) -> StratumResult<Vec<(Uri, Uri)>> {
    let mut replaced: Vec<(Uri, Uri)> = Vec::new();
    let relations = cache.get_all(TypeKey::Relation, &[partition]);
    for relation in relations {
        let data: EntityData = relation
            .read()
            .map_err(|_| CacheError::LockPoisoned)?
            .clone();
        let Some(link) = data.link.clone() else {
            continue;
        };
        let expected = canonical_relationship_uri(&link.source, &link.edge_type, &link.target);
        if data.uri == expected {
            continue;
        }

        cache.evict(&relation, TypeKey::Relation, false)?;
        let renamed: Entity = new_entity(EntityData {
            uri: expected.clone(),
            ..data.clone()
        });
        cache.stage(&renamed, TypeKey::Relation, partition)?;
        index.repoint(&data.uri, &expected, &link);
        debug!(old = %data.uri, new = %expected, "canonicalized relationship URI");
        replaced.push((data.uri, expected));
    }
    Ok(replaced)
}

// =============================================================================
// TESTS
// =============================================================================
