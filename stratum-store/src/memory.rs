//! In-memory store gateway.
//!
//! Backs tests and small models with real transaction semantics: writes are
//! buffered per open transaction, applied in order on commit, discarded on
//! abort. Commit-failure hooks let sync failure paths be exercised.

use crate::{DefaultSettingRecord, StoreGateway, TxId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use stratum_core::{
    EntityData, LinkSpec, Partition, StoreError, StratumResult, TypeKey, Uri,
};

#[derive(Debug, Default)]
struct Graph {
    entities: HashMap<Uri, (TypeKey, EntityData)>,
    links: HashSet<LinkSpec>,
    subtypes: Vec<(Uri, Uri)>,
    settings: Vec<DefaultSettingRecord>,
}

#[derive(Debug)]
enum TxOp {
    PutEntity(Partition, TypeKey, EntityData),
    DeleteEntity(Uri, Vec<Partition>),
    PutLink(Partition, LinkSpec),
    DeleteLink(LinkSpec, Vec<Partition>),
}

#[derive(Debug)]
struct TxBuffer {
    partitions: Vec<Partition>,
    ops: Vec<TxOp>,
}

/// In-memory [`StoreGateway`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graphs: RwLock<HashMap<Partition, Graph>>,
    txs: RwLock<HashMap<TxId, TxBuffer>>,
    next_tx: AtomicU64,
    /// One-shot: the next commit touching this partition fails.
    fail_commit_on: RwLock<Option<Partition>>,
    /// Count of read_all/read_entity calls, for cache-hit assertions.
    reads: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity directly, outside any transaction. Test fixture.
    pub fn seed_entity(&self, partition: Partition, type_key: TypeKey, entity: EntityData) {
        let mut graphs = self.graphs.write().unwrap();
        graphs
            .entry(partition)
            .or_default()
            .entities
            .insert(entity.uri.clone(), (type_key, entity));
    }

    /// Insert a raw edge fact directly. Test fixture.
    pub fn seed_link(&self, partition: Partition, link: LinkSpec) {
        let mut graphs = self.graphs.write().unwrap();
        graphs.entry(partition).or_default().links.insert(link);
    }

    /// Declare a subtype pair in a partition. Test fixture.
    pub fn seed_subtype(&self, partition: Partition, sub: impl Into<Uri>, sup: impl Into<Uri>) {
        let mut graphs = self.graphs.write().unwrap();
        graphs
            .entry(partition)
            .or_default()
            .subtypes
            .push((sub.into(), sup.into()));
    }

    /// Declare a default setting in a partition. Test fixture.
    pub fn seed_default_setting(&self, partition: Partition, record: DefaultSettingRecord) {
        let mut graphs = self.graphs.write().unwrap();
        graphs.entry(partition).or_default().settings.push(record);
    }

    /// Make the next commit touching `partition` fail and discard its buffer.
    pub fn fail_next_commit_on(&self, partition: Partition) {
        *self.fail_commit_on.write().unwrap() = Some(partition);
    }

    /// Number of entities committed to a partition.
    pub fn entity_count(&self, partition: Partition) -> usize {
        self.graphs
            .read()
            .unwrap()
            .get(&partition)
            .map(|g| g.entities.len())
            .unwrap_or(0)
    }

    /// Whether a committed resource exists at this URI in any listed partition.
    pub fn contains_entity(&self, uri: &Uri, partitions: &[Partition]) -> bool {
        let graphs = self.graphs.read().unwrap();
        partitions.iter().any(|p| {
            graphs
                .get(p)
                .map(|g| g.entities.contains_key(uri))
                .unwrap_or(false)
        })
    }

    /// Number of committed edge facts in a partition.
    pub fn link_count(&self, partition: Partition) -> usize {
        self.graphs
            .read()
            .unwrap()
            .get(&partition)
            .map(|g| g.links.len())
            .unwrap_or(0)
    }

    /// Total read_all/read_entity calls served so far.
    pub fn read_ops(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of open transactions.
    pub fn open_tx_count(&self) -> usize {
        self.txs.read().unwrap().len()
    }

    fn apply(graphs: &mut HashMap<Partition, Graph>, op: TxOp) {
        match op {
            TxOp::PutEntity(partition, type_key, entity) => {
                graphs
                    .entry(partition)
                    .or_default()
                    .entities
                    .insert(entity.uri.clone(), (type_key, entity));
            }
            TxOp::DeleteEntity(uri, partitions) => {
                for p in partitions {
                    if let Some(graph) = graphs.get_mut(&p) {
                        graph.entities.remove(&uri);
                    }
                }
            }
            TxOp::PutLink(partition, link) => {
                graphs.entry(partition).or_default().links.insert(link);
            }
            TxOp::DeleteLink(link, partitions) => {
                for p in partitions {
                    if let Some(graph) = graphs.get_mut(&p) {
                        graph.links.remove(&link);
                    }
                }
            }
        }
    }

    fn buffer_op(&self, tx: TxId, op: TxOp) -> StratumResult<()> {
        let mut txs = self.txs.write().map_err(|_| StoreError::LockPoisoned)?;
        let buffer = txs
            .get_mut(&tx)
            .ok_or(StoreError::UnknownTransaction { tx_id: tx })?;
        buffer.ops.push(op);
        Ok(())
    }
}

impl StoreGateway for MemoryStore {
    fn begin(&self, partitions: &[Partition]) -> StratumResult<TxId> {
        let tx = self.next_tx.fetch_add(1, Ordering::Relaxed) + 1;
        self.txs
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(
                tx,
                TxBuffer {
                    partitions: partitions.to_vec(),
                    ops: Vec::new(),
                },
            );
        Ok(tx)
    }

    fn commit(&self, tx: TxId) -> StratumResult<()> {
        let buffer = self
            .txs
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(&tx)
            .ok_or(StoreError::UnknownTransaction { tx_id: tx })?;

        let mut fail_on = self
            .fail_commit_on
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        if let Some(poisoned) = *fail_on {
            if buffer.partitions.contains(&poisoned) {
                *fail_on = None;
                return Err(StoreError::CommitFailed {
                    tx_id: tx,
                    reason: format!("injected failure on partition {}", poisoned),
                }
                .into());
            }
        }
        drop(fail_on);

        let mut graphs = self.graphs.write().map_err(|_| StoreError::LockPoisoned)?;
        for op in buffer.ops {
            Self::apply(&mut graphs, op);
        }
        Ok(())
    }

    fn abort(&self, tx: TxId) -> StratumResult<()> {
        self.txs
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(&tx)
            .ok_or(StoreError::UnknownTransaction { tx_id: tx })?;
        Ok(())
    }

    fn resolve_partition(&self, partition: Partition) -> String {
        format!("urn:stratum:graph:{}", partition)
    }

    fn read_all(&self, type_key: TypeKey, partition: Partition) -> StratumResult<Vec<EntityData>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let graphs = self.graphs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(graphs
            .get(&partition)
            .map(|g| {
                g.entities
                    .values()
                    .filter(|(key, _)| *key == type_key)
                    .map(|(_, data)| data.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read_entity(
        &self,
        uri: &Uri,
        partitions: &[Partition],
    ) -> StratumResult<Option<(Partition, EntityData)>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let graphs = self.graphs.read().map_err(|_| StoreError::LockPoisoned)?;
        for p in partitions {
            if let Some((_, data)) = graphs.get(p).and_then(|g| g.entities.get(uri)) {
                return Ok(Some((*p, data.clone())));
            }
        }
        Ok(None)
    }

    fn write_entity(
        &self,
        tx: TxId,
        partition: Partition,
        type_key: TypeKey,
        entity: &EntityData,
    ) -> StratumResult<()> {
        self.buffer_op(tx, TxOp::PutEntity(partition, type_key, entity.clone()))
    }

    fn delete_entity(&self, tx: TxId, uri: &Uri, partitions: &[Partition]) -> StratumResult<()> {
        self.buffer_op(tx, TxOp::DeleteEntity(uri.clone(), partitions.to_vec()))
    }

    fn write_link(&self, tx: TxId, partition: Partition, link: &LinkSpec) -> StratumResult<()> {
        self.buffer_op(tx, TxOp::PutLink(partition, link.clone()))
    }

    fn delete_link(
        &self,
        tx: TxId,
        link: &LinkSpec,
        partitions: &[Partition],
    ) -> StratumResult<()> {
        self.buffer_op(tx, TxOp::DeleteLink(link.clone(), partitions.to_vec()))
    }

    fn link_exists(&self, link: &LinkSpec, partitions: &[Partition]) -> StratumResult<bool> {
        let graphs = self.graphs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(partitions
            .iter()
            .any(|p| graphs.get(p).map(|g| g.links.contains(link)).unwrap_or(false)))
    }

    fn read_subtypes(&self, partition: Partition) -> StratumResult<Vec<(Uri, Uri)>> {
        let graphs = self.graphs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(graphs
            .get(&partition)
            .map(|g| g.subtypes.clone())
            .unwrap_or_default())
    }

    fn read_default_settings(
        &self,
        partition: Partition,
    ) -> StratumResult<Vec<DefaultSettingRecord>> {
        let graphs = self.graphs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(graphs
            .get(&partition)
            .map(|g| g.settings.clone())
            .unwrap_or_default())
    }
}

// =============================================================================
// TESTS
// =============================================================================
