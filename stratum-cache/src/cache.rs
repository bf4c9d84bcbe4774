//! The entity cache: per-partition, per-type, per-URI storage with validity
//! tracking at two granularities and write-back staging sets.
//!
//! Validity contracts:
//!
//! - *Type-validity* for (partition, type key) asserts that every entity of
//!   that type existing in the partition is cached, so "get all of type T"
//!   needs no store round trip.
//! - *Entity-validity* for (partition, URI) asserts that the cache's answer
//!   for that URI is authoritative, including authoritative absence: a
//!   deleted entity stays valid with no value, and must never fall through
//!   to the store as an un-cached unknown.
//!
//! Staging: entities pending store are keyed by (partition, type key);
//! entities pending delete by type key alone, since deletion is applied to
//! every system partition at sync. A store after a delete cancels the delete
//! entry and vice versa, so the two sets never both hold the same identity.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use stratum_core::{CacheError, Entity, Partition, StratumResult, TypeKey, Uri};

/// Write-back entity cache for one session over one model.
#[derive(Debug, Default)]
pub struct EntityCache {
    /// partition -> type key -> URI -> entity handle.
    by_type: HashMap<Partition, HashMap<TypeKey, HashMap<Uri, Entity>>>,
    /// partition -> URI -> entity handle, across all types.
    by_uri: HashMap<Partition, HashMap<Uri, Entity>>,
    /// Type-validity flags per partition.
    type_valid: HashMap<Partition, HashSet<TypeKey>>,
    /// Entity-validity flags per partition.
    entity_valid: HashMap<Partition, HashSet<Uri>>,
    /// Entities pending write-back, per (partition, type key).
    pending_store: HashMap<Partition, HashMap<TypeKey, HashMap<Uri, Entity>>>,
    /// Entities pending deletion, per type key (deletion is partition-agnostic).
    pending_delete: HashMap<TypeKey, HashMap<Uri, Entity>>,
    /// Partitions a delete must be applied to.
    system_partitions: Vec<Partition>,
    /// Treat replacing a cached handle with a different handle as corruption.
    strict_duplicates: bool,
}

impl EntityCache {
    /// Create an all-invalid cache over the given system partitions.
    pub fn new(system_partitions: Vec<Partition>, strict_duplicates: bool) -> Self {
        Self {
            system_partitions,
            strict_duplicates,
            ..Self::default()
        }
    }

    fn read_uri(entity: &Entity) -> StratumResult<Uri> {
        Ok(entity
            .read()
            .map_err(|_| CacheError::LockPoisoned)?
            .uri
            .clone())
    }

    fn insert_handle(
        &mut self,
        entity: &Entity,
        uri: &Uri,
        type_key: TypeKey,
        partition: Partition,
    ) -> StratumResult<()> {
        if self.strict_duplicates {
            if let Some(existing) = self.by_uri.get(&partition).and_then(|m| m.get(uri)) {
                if !Arc::ptr_eq(existing, entity) {
                    return Err(CacheError::DuplicateUri {
                        uri: uri.clone(),
                        partition,
                    }
                    .into());
                }
            }
        }
        self.by_type
            .entry(partition)
            .or_default()
            .entry(type_key)
            .or_default()
            .insert(uri.clone(), Arc::clone(entity));
        self.by_uri
            .entry(partition)
            .or_default()
            .insert(uri.clone(), Arc::clone(entity));
        Ok(())
    }

    /// Bulk-insert entities of one type into a partition.
    ///
    /// `all_of_type` asserts the slice is the complete population of this
    /// type in `partition` and sets type-validity there. Entity-validity is
    /// set for every inserted URI in `partition` and in every partition in
    /// `extra_partitions`, so a load event that scanned several partitions
    /// marks them all authoritative at once.
    ///
    /// A batch containing the same URI twice is a data-integrity error.
    pub fn cache_all(
        &mut self,
        entities: &[Entity],
        type_key: TypeKey,
        all_of_type: bool,
        partition: Partition,
        extra_partitions: &[Partition],
    ) -> StratumResult<()> {
        let mut seen: HashSet<Uri> = HashSet::with_capacity(entities.len());
        for entity in entities {
            let uri = Self::read_uri(entity)?;
            if !seen.insert(uri.clone()) {
                return Err(CacheError::DuplicateUri { uri, partition }.into());
            }
            self.insert_handle(entity, &uri, type_key, partition)?;
            self.mark_entity_valid(&uri, &[partition]);
            self.mark_entity_valid(&uri, extra_partitions);
        }
        if all_of_type {
            self.type_valid.entry(partition).or_default().insert(type_key);
        }
        Ok(())
    }

    /// Single-entity analogue of [`cache_all`](Self::cache_all); same
    /// validity semantics.
    pub fn cache_one(
        &mut self,
        entity: &Entity,
        type_key: TypeKey,
        all_of_type: bool,
        partition: Partition,
        extra_partitions: &[Partition],
    ) -> StratumResult<()> {
        let uri = Self::read_uri(entity)?;
        self.insert_handle(entity, &uri, type_key, partition)?;
        self.mark_entity_valid(&uri, &[partition]);
        self.mark_entity_valid(&uri, extra_partitions);
        if all_of_type {
            self.type_valid.entry(partition).or_default().insert(type_key);
        }
        Ok(())
    }

    /// Cache an entity and stage it for write-back to `partition`.
    ///
    /// Does not touch type-validity: a single store does not imply the type's
    /// population is complete. Cancels any pending delete for the same URI.
    pub fn stage(
        &mut self,
        entity: &Entity,
        type_key: TypeKey,
        partition: Partition,
    ) -> StratumResult<()> {
        let uri = Self::read_uri(entity)?;
        self.insert_handle(entity, &uri, type_key, partition)?;
        self.mark_entity_valid(&uri, &[partition]);
        self.pending_store
            .entry(partition)
            .or_default()
            .entry(type_key)
            .or_default()
            .insert(uri.clone(), Arc::clone(entity));
        // A store after a delete cancels the delete.
        if let Some(deletes) = self.pending_delete.get_mut(&type_key) {
            deletes.remove(&uri);
        }
        Ok(())
    }

    /// Remove an entity from the cache and, unless `skip_delete`, stage it
    /// for deletion from every system partition on the next sync.
    ///
    /// Cancels any pending store for the URI. Entity-validity is set (and
    /// left) true across the system partitions: a later read must see
    /// authoritative absence, not fall through to the store and resurrect
    /// the entity from data that has not been deleted yet.
    ///
    /// Type-validity for the touched partitions is dropped rather than
    /// patched; partial inserts afterwards do not restore it.
    pub fn evict(
        &mut self,
        entity: &Entity,
        type_key: TypeKey,
        skip_delete: bool,
    ) -> StratumResult<()> {
        let uri = Self::read_uri(entity)?;
        let system = self.system_partitions.clone();
        for partition in &system {
            let was_valid = self
                .entity_valid
                .get(partition)
                .map(|set| set.contains(&uri))
                .unwrap_or(false);
            if !was_valid {
                continue;
            }
            if let Some(typed) = self
                .by_type
                .get_mut(partition)
                .and_then(|m| m.get_mut(&type_key))
            {
                typed.remove(&uri);
            }
            if let Some(flat) = self.by_uri.get_mut(partition) {
                flat.remove(&uri);
            }
            if let Some(staged) = self
                .pending_store
                .get_mut(partition)
                .and_then(|m| m.get_mut(&type_key))
            {
                staged.remove(&uri);
            }
            if let Some(valid_types) = self.type_valid.get_mut(partition) {
                valid_types.remove(&type_key);
            }
        }
        self.mark_entity_valid(&uri, &system);
        if !skip_delete {
            self.pending_delete
                .entry(type_key)
                .or_default()
                .insert(uri, Arc::clone(entity));
        }
        Ok(())
    }

    /// Apply [`evict`](Self::evict) to every entity in the map. Not atomic
    /// across the set.
    pub fn evict_all(
        &mut self,
        entities: &HashMap<Uri, Entity>,
        type_key: TypeKey,
    ) -> StratumResult<()> {
        for entity in entities.values() {
            self.evict(entity, type_key, false)?;
        }
        Ok(())
    }

    /// First cached value for this URI across the partitions, in order.
    ///
    /// Returns `None` both on authoritative absence and on a plain miss;
    /// callers distinguish the two with [`entity_valid`](Self::entity_valid).
    pub fn get(&self, uri: &Uri, type_key: TypeKey, partitions: &[Partition]) -> Option<Entity> {
        for partition in partitions {
            if let Some(entity) = self
                .by_type
                .get(partition)
                .and_then(|m| m.get(&type_key))
                .and_then(|m| m.get(uri))
            {
                return Some(Arc::clone(entity));
            }
        }
        None
    }

    /// Union of the by-type maps across the partitions.
    ///
    /// When the same URI is cached in more than one partition, the entity
    /// from the last listed partition wins; no merging is attempted.
    pub fn get_all(&self, type_key: TypeKey, partitions: &[Partition]) -> Vec<Entity> {
        let mut merged: HashMap<Uri, Entity> = HashMap::new();
        for partition in partitions {
            if let Some(typed) = self.by_type.get(partition).and_then(|m| m.get(&type_key)) {
                for (uri, entity) in typed {
                    merged.insert(uri.clone(), Arc::clone(entity));
                }
            }
        }
        merged.into_values().collect()
    }

    /// True only if type-validity holds in every listed partition.
    pub fn type_valid(&self, type_key: TypeKey, partitions: &[Partition]) -> bool {
        !partitions.is_empty()
            && partitions.iter().all(|p| {
                self.type_valid
                    .get(p)
                    .map(|set| set.contains(&type_key))
                    .unwrap_or(false)
            })
    }

    /// True only if entity-validity holds in every listed partition.
    pub fn entity_valid(&self, uri: &Uri, partitions: &[Partition]) -> bool {
        !partitions.is_empty()
            && partitions.iter().all(|p| {
                self.entity_valid
                    .get(p)
                    .map(|set| set.contains(uri))
                    .unwrap_or(false)
            })
    }

    /// Mark the cache's answer for a URI authoritative in the given
    /// partitions without inserting a value (caches a confirmed absence).
    pub fn mark_entity_valid(&mut self, uri: &Uri, partitions: &[Partition]) {
        for partition in partitions {
            self.entity_valid
                .entry(*partition)
                .or_default()
                .insert(uri.clone());
        }
    }

    /// Reconcile staging immediately before sync: any pending-delete URI
    /// that is cached again in a system partition (re-stored or reloaded
    /// since the delete) has its delete entry dropped.
    pub fn prepare_sync(&mut self) {
        let system = self.system_partitions.clone();
        let mut cancelled: Vec<(TypeKey, Uri)> = Vec::new();
        for (type_key, deletes) in &self.pending_delete {
            for uri in deletes.keys() {
                let still_cached = system.iter().any(|p| {
                    self.by_type
                        .get(p)
                        .and_then(|m| m.get(type_key))
                        .map(|m| m.contains_key(uri))
                        .unwrap_or(false)
                });
                if still_cached {
                    cancelled.push((*type_key, uri.clone()));
                }
            }
        }
        for (type_key, uri) in cancelled {
            if let Some(deletes) = self.pending_delete.get_mut(&type_key) {
                deletes.remove(&uri);
            }
        }
    }

    /// Drop everything, returning to the initial all-invalid state. Only
    /// legal immediately after a fully successful sync.
    pub fn clear(&mut self) {
        self.by_type.clear();
        self.by_uri.clear();
        self.type_valid.clear();
        self.entity_valid.clear();
        self.pending_store.clear();
        self.pending_delete.clear();
    }

    // === Staging accessors used by the sync engine ===

    /// Snapshot of the pending-delete sets (handles are shared, not copied).
    pub fn pending_deletes(&self) -> HashMap<TypeKey, HashMap<Uri, Entity>> {
        self.pending_delete.clone()
    }

    /// Snapshot of the pending-store set for one partition.
    pub fn pending_store_for(&self, partition: Partition) -> HashMap<TypeKey, HashMap<Uri, Entity>> {
        self.pending_store.get(&partition).cloned().unwrap_or_default()
    }

    /// Whether any delete is staged.
    pub fn has_pending_deletes(&self) -> bool {
        self.pending_delete.values().any(|m| !m.is_empty())
    }

    /// Whether a specific URI is staged for deletion under a type key.
    pub fn is_pending_delete(&self, uri: &Uri, type_key: TypeKey) -> bool {
        self.pending_delete
            .get(&type_key)
            .map(|m| m.contains_key(uri))
            .unwrap_or(false)
    }

    /// Whether a specific URI is staged for store in a partition.
    pub fn is_pending_store(&self, uri: &Uri, type_key: TypeKey, partition: Partition) -> bool {
        self.pending_store
            .get(&partition)
            .and_then(|m| m.get(&type_key))
            .map(|m| m.contains_key(uri))
            .unwrap_or(false)
    }

    /// Clear all pending-delete sets. Called after the delete phase commits.
    pub fn clear_pending_deletes(&mut self) {
        self.pending_delete.clear();
    }

    /// Clear one partition's pending-store set. Called after that
    /// partition's store phase commits.
    pub fn clear_pending_store(&mut self, partition: Partition) {
        self.pending_store.remove(&partition);
    }

    /// Partitions a delete is applied to.
    pub fn system_partitions(&self) -> &[Partition] {
        &self.system_partitions
    }
}

// =============================================================================
// TESTS
// =============================================================================
