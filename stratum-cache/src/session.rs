//! Session: one unit-of-work over one model.
//!
//! A session owns the cache, the relationship index, the type hierarchy and
//! the default-setting maps, replacing any notion of a process-wide cache
//! registry: lifecycle is explicit construction and drop. It is not designed
//! for concurrent mutation; callers hold a coarse lock around a
//! read-modify-sync cycle if they share one across threads.
//!
//! Callers must run [`Session::init`] once before any get/store/delete; a
//! failed [`Session::sync`] leaves the cache untouched as the source of
//! truth for a retry, while partitions committed before the failure are
//! already applied to the store.

use crate::cache::EntityCache;
use crate::defaults::DefaultSettingResolver;
use crate::hierarchy::TypeHierarchy;
use crate::relindex::RelationshipIndex;
use crate::repair;
use crate::sync::{SyncEngine, SyncReport};
use std::collections::HashMap;
use stratum_core::{
    CacheError, Entity, EntityKind, Partition, SessionConfig, SettingKind, StratumResult, TypeKey,
    TypeRegistry, Uri,
};
use stratum_store::StoreGateway;
use tracing::{debug, info};

/// One cache session over one model.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    cache: EntityCache,
    rel_index: RelationshipIndex,
    hierarchy: TypeHierarchy,
    defaults: DefaultSettingResolver,
    initialized: bool,
}

impl Session {
    /// Create an uninitialized session.
    pub fn new(config: SessionConfig) -> Self {
        let cache = EntityCache::new(
            config.system_partitions.clone(),
            config.strict_duplicates,
        );
        Self {
            config,
            cache,
            rel_index: RelationshipIndex::new(),
            hierarchy: TypeHierarchy::new(),
            defaults: DefaultSettingResolver::new(),
            initialized: false,
        }
    }

    /// Build the type hierarchy and default-setting maps from the schema
    /// partition. Must run once before any get/store/delete.
    pub fn init(&mut self, store: &dyn StoreGateway) -> StratumResult<()> {
        let pairs = store.read_subtypes(self.config.schema_partition)?;
        let subtype_count = pairs.len();
        self.hierarchy = TypeHierarchy::from_pairs(pairs);

        let records = store.read_default_settings(self.config.schema_partition)?;
        let setting_count = records.len();
        self.defaults = DefaultSettingResolver::from_records(records);

        self.initialized = true;
        info!(
            model = %self.config.model_uri,
            subtypes = subtype_count,
            settings = setting_count,
            "session initialized"
        );
        Ok(())
    }

    fn ensure_init(&self) -> StratumResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(CacheError::NotInitialized.into())
        }
    }

    fn index_if_relationship(&mut self, type_key: TypeKey, entity: &Entity) -> StratumResult<()> {
        if TypeRegistry::kind_of(type_key) != EntityKind::Relationship {
            return Ok(());
        }
        let guard = entity.read().map_err(|_| CacheError::LockPoisoned)?;
        if let Some(link) = &guard.link {
            self.rel_index.record(&guard.uri, link);
        }
        Ok(())
    }

    /// Read one entity, from the cache when its answer is authoritative,
    /// otherwise through the gateway (populating the cache either way).
    ///
    /// Returns `None` both for a confirmed absence and for a URI the store
    /// does not hold; after this call the absence is cached as valid, so
    /// repeated reads cost no store round trips.
    pub fn fetch(
        &mut self,
        uri: &Uri,
        type_key: TypeKey,
        partitions: &[Partition],
        store: &dyn StoreGateway,
    ) -> StratumResult<Option<Entity>> {
        self.ensure_init()?;
        if let Some(entity) = self.cache.get(uri, type_key, partitions) {
            return Ok(Some(entity));
        }
        // Authoritative absence in any queried partition: do not touch the
        // store. A deleted entity must read as gone, not as unknown.
        if partitions.iter().any(|p| self.cache.entity_valid(uri, &[*p])) {
            return Ok(None);
        }

        match store.read_entity(uri, partitions)? {
            Some((home, data)) => {
                let entity = stratum_core::new_entity(data);
                let extras: Vec<Partition> =
                    partitions.iter().copied().filter(|p| *p != home).collect();
                self.cache
                    .cache_one(&entity, type_key, false, home, &extras)?;
                self.index_if_relationship(type_key, &entity)?;
                Ok(Some(entity))
            }
            None => {
                // Cache the absence as a valid fact across everything scanned.
                self.cache.mark_entity_valid(uri, partitions);
                Ok(None)
            }
        }
    }

    /// Read every entity of a type across partitions, loading any partition
    /// whose population is not yet complete in the cache.
    pub fn fetch_all(
        &mut self,
        type_key: TypeKey,
        partitions: &[Partition],
        store: &dyn StoreGateway,
    ) -> StratumResult<Vec<Entity>> {
        self.ensure_init()?;
        for &partition in partitions {
            if self.cache.type_valid(type_key, &[partition]) {
                continue;
            }
            let loaded: Vec<Entity> = store
                .read_all(type_key, partition)?
                .into_iter()
                .map(stratum_core::new_entity)
                .collect();
            debug!(type_key = %type_key, partition = %partition, count = loaded.len(), "populated type from store");
            self.cache.cache_all(&loaded, type_key, true, partition, &[])?;
            for entity in &loaded {
                self.index_if_relationship(type_key, entity)?;
            }
        }
        Ok(self.cache.get_all(type_key, partitions))
    }

    /// Cache an entity and stage it for write-back. Relationship entities
    /// are recorded in the endpoint index in the same step.
    pub fn stage(
        &mut self,
        entity: &Entity,
        type_key: TypeKey,
        partition: Partition,
    ) -> StratumResult<()> {
        self.ensure_init()?;
        if !TypeRegistry::resides_in(type_key, partition) {
            return Err(CacheError::IllegalResidency {
                type_key,
                partition,
            }
            .into());
        }
        self.cache.stage(entity, type_key, partition)?;
        self.index_if_relationship(type_key, entity)
    }

    /// Remove an entity from the cache and stage its deletion. Relationship
    /// entities are stripped from the endpoint index in the same step, and
    /// deleting an endpoint cascades to every relationship touching it;
    /// cache and index never disagree about a relationship's existence.
    pub fn delete(&mut self, entity: &Entity, type_key: TypeKey) -> StratumResult<()> {
        self.ensure_init()?;
        let (uri, link) = {
            let guard = entity.read().map_err(|_| CacheError::LockPoisoned)?;
            (guard.uri.clone(), guard.link.clone())
        };
        match TypeRegistry::kind_of(type_key) {
            EntityKind::Relationship => {
                if let Some(link) = link {
                    self.rel_index.remove(&uri, &link);
                }
            }
            EntityKind::Endpoint => {
                // A relationship cannot outlive either endpoint. Deleting
                // each one strips both of its index sides, so the opposite
                // endpoint's entry never dangles.
                let touching: Vec<Uri> = self
                    .rel_index
                    .outgoing_of(&uri)
                    .iter()
                    .chain(self.rel_index.incoming_of(&uri).iter())
                    .cloned()
                    .collect();
                let system = self.config.system_partitions.clone();
                for rel_uri in touching {
                    if let Some(rel) = self.cache.get(&rel_uri, TypeKey::Relation, &system) {
                        self.delete(&rel, TypeKey::Relation)?;
                    }
                }
                self.rel_index.remove_endpoint(&uri);
            }
            EntityKind::Plain => {}
        }
        self.cache.evict(entity, type_key, false)
    }

    /// Delete every entity in the map; not atomic across the set.
    pub fn delete_all(
        &mut self,
        entities: &HashMap<Uri, Entity>,
        type_key: TypeKey,
    ) -> StratumResult<()> {
        for entity in entities.values() {
            self.delete(entity, type_key)?;
        }
        Ok(())
    }

    /// Resolve an inherited default setting for a concrete ontology type.
    pub fn default_setting(&self, type_uri: &Uri, kind: SettingKind) -> Option<&Uri> {
        self.defaults.resolve(&self.hierarchy, type_uri, kind)
    }

    /// Reconcile staging and flush it through the gateway.
    pub fn sync(
        &mut self,
        store: &dyn StoreGateway,
        partitions: &[Partition],
    ) -> StratumResult<SyncReport> {
        self.ensure_init()?;
        self.cache.prepare_sync();
        let engine = SyncEngine::new(self.config.system_partitions.clone());
        engine.sync(&mut self.cache, store, partitions)
    }

    /// Strip directly-asserted cardinality values from cached relationships.
    pub fn strip_asserted_cardinality(
        &mut self,
        partitions: &[Partition],
    ) -> StratumResult<usize> {
        self.ensure_init()?;
        repair::strip_asserted_cardinality(&mut self.cache, partitions)
    }

    /// Replace cached relationships whose URI disagrees with the canonical
    /// function of their endpoints.
    pub fn canonicalize_relationships(
        &mut self,
        partition: Partition,
    ) -> StratumResult<Vec<(Uri, Uri)>> {
        self.ensure_init()?;
        repair::canonicalize_relationship_uris(&mut self.cache, &mut self.rel_index, partition)
    }

    /// Drop all cached state. Only legal immediately after a fully
    /// successful sync.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.rel_index.clear();
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut EntityCache {
        &mut self.cache
    }

    pub fn relationships(&self) -> &RelationshipIndex {
        &self.rel_index
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }
}

// =============================================================================
// TESTS
// =============================================================================
