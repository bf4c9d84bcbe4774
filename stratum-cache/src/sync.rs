//! The synchronization engine: two-phase write-back of staged mutations.
//!
//! Phase 1 deletes, phase 2 stores. The delete phase runs in one transaction
//! over the system partitions and is all-or-nothing. The store phase runs one
//! transaction per partition, iterated independently: a failure aborts that
//! partition's transaction and the whole call, but partitions processed
//! earlier stay committed. Staging is cleared only for scopes that committed,
//! and the cache is never rolled back - it remains the source of truth for a
//! retry.

use crate::cache::EntityCache;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use stratum_core::{
    CacheError, Entity, EntityData, EntityKind, Partition, StratumError, StratumResult, SyncError,
    TypeKey, TypeRegistry, Uri,
};
use stratum_store::StoreGateway;
use tracing::{debug, error, info};

/// Outcome of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Entities deleted from the store in the delete phase.
    pub deleted: usize,
    /// Entities written per partition in the store phase.
    pub stored: Vec<(Partition, usize)>,
    /// When the sync completed.
    pub completed_at: DateTime<Utc>,
}

/// Orchestrates write-back against a store gateway.
#[derive(Debug)]
pub struct SyncEngine {
    system_partitions: Vec<Partition>,
}

impl SyncEngine {
    /// Create an engine applying deletes to the given system partitions.
    pub fn new(system_partitions: Vec<Partition>) -> Self {
        Self { system_partitions }
    }

    /// Flush staged mutations: delete phase, then per-partition store phase.
    ///
    /// The caller must have run [`EntityCache::prepare_sync`] first. On
    /// success the staging sets are empty for the synced scopes and cached
    /// values are retained (they now match the store).
    pub fn sync(
        &self,
        cache: &mut EntityCache,
        store: &dyn StoreGateway,
        partitions: &[Partition],
    ) -> StratumResult<SyncReport> {
        let deleted = self.run_delete_phase(cache, store)?;

        let mut committed: Vec<Partition> = Vec::new();
        let mut stored: Vec<(Partition, usize)> = Vec::new();
        for &partition in partitions {
            let staged = cache.pending_store_for(partition);
            if staged.values().all(|m| m.is_empty()) {
                continue;
            }
            match self.store_one_partition(store, partition, &staged) {
                Ok(count) => {
                    cache.clear_pending_store(partition);
                    committed.push(partition);
                    stored.push((partition, count));
                    debug!(partition = %partition, entities = count, "store phase committed");
                }
                Err(reason) => {
                    error!(partition = %partition, %reason, "store phase aborted");
                    return Err(SyncError::StorePhaseFailed {
                        partition,
                        committed,
                        reason,
                    }
                    .into());
                }
            }
        }

        let report = SyncReport {
            deleted,
            stored,
            completed_at: Utc::now(),
        };
        info!(
            deleted = report.deleted,
            partitions = report.stored.len(),
            "sync completed"
        );
        Ok(report)
    }

    /// Delete phase: one transaction over the system partitions.
    fn run_delete_phase(
        &self,
        cache: &mut EntityCache,
        store: &dyn StoreGateway,
    ) -> StratumResult<usize> {
        if !cache.has_pending_deletes() {
            return Ok(0);
        }
        let pending = cache.pending_deletes();
        let tx = store.begin(&self.system_partitions).map_err(|e| {
            SyncError::DeletePhaseFailed {
                reason: e.to_string(),
            }
        })?;

        let result = self.buffer_deletes(store, tx, &pending);
        match result {
            Ok(count) => {
                if let Err(e) = store.commit(tx) {
                    // Best-effort: a backend that consumed the transaction
                    // on the failed commit reports it unknown here.
                    let _ = store.abort(tx);
                    error!(reason = %e, "delete phase commit failed");
                    return Err(SyncError::DeletePhaseFailed {
                        reason: e.to_string(),
                    }
                    .into());
                }
                cache.clear_pending_deletes();
                debug!(entities = count, "delete phase committed");
                Ok(count)
            }
            Err(e) => {
                let _ = store.abort(tx);
                error!(reason = %e, "delete phase aborted");
                Err(SyncError::DeletePhaseFailed {
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    fn buffer_deletes(
        &self,
        store: &dyn StoreGateway,
        tx: stratum_store::TxId,
        pending: &HashMap<TypeKey, HashMap<Uri, Entity>>,
    ) -> StratumResult<usize> {
        let mut count = 0;
        for (type_key, entities) in pending {
            // Relationship edge facts go first, so no raw edge survives
            // its entity resource.
            if TypeRegistry::kind_of(*type_key) == EntityKind::Relationship {
                for entity in entities.values() {
                    let link = entity
                        .read()
                        .map_err(|_| StratumError::from(CacheError::LockPoisoned))?
                        .link
                        .clone();
                    if let Some(link) = link {
                        store.delete_link(tx, &link, &self.system_partitions)?;
                    }
                }
            }
            for uri in entities.keys() {
                store.delete_entity(tx, uri, &self.system_partitions)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Store phase for one partition: endpoints first, then the rest; for
    /// relationship entities the raw edge fact precedes the resource, guarded
    /// by an existence check so repeated syncs do not duplicate facts.
    fn store_one_partition(
        &self,
        store: &dyn StoreGateway,
        partition: Partition,
        staged: &HashMap<TypeKey, HashMap<Uri, Entity>>,
    ) -> Result<usize, String> {
        let tx = store.begin(&[partition]).map_err(|e| e.to_string())?;

        let mut keys: Vec<TypeKey> = staged.keys().copied().collect();
        // Endpoints first keeps edge facts from referencing resources that
        // do not exist yet within the transaction.
        keys.sort_by_key(|k| {
            (
                TypeRegistry::kind_of(*k) != EntityKind::Endpoint,
                k.as_str(),
            )
        });

        let result = (|| -> StratumResult<usize> {
            let mut count = 0;
            for key in &keys {
                for entity in staged[key].values() {
                    let data: EntityData = entity
                        .read()
                        .map_err(|_| StratumError::from(CacheError::LockPoisoned))?
                        .clone();
                    if TypeRegistry::kind_of(*key) == EntityKind::Relationship {
                        if let Some(link) = &data.link {
                            if !store.link_exists(link, &[partition])? {
                                store.write_link(tx, partition, link)?;
                            }
                        }
                    }
                    store.write_entity(tx, partition, *key, &data)?;
                    count += 1;
                }
            }
            Ok(count)
        })();

        match result {
            Ok(count) => {
                if let Err(e) = store.commit(tx) {
                    let _ = store.abort(tx);
                    return Err(e.to_string());
                }
                Ok(count)
            }
            Err(e) => {
                let _ = store.abort(tx);
                Err(e.to_string())
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
