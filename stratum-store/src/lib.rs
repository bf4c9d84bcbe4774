//! Stratum Store - Store Gateway Trait and In-Memory Backend
//!
//! Defines the gateway abstraction the sync engine writes through. The
//! gateway is a blocking trait: store I/O during sync is the only blocking
//! operation in the system, and each transaction is scoped to an explicit
//! partition list.

pub mod memory;

pub use memory::MemoryStore;

use stratum_core::{EntityData, LinkSpec, Partition, SettingKind, StratumResult, TypeKey, Uri};

/// Opaque transaction handle issued by [`StoreGateway::begin`].
pub type TxId = u64;

/// One inheritable default-setting declaration from the schema partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSettingRecord {
    /// Ontology type the setting is declared on.
    pub type_uri: Uri,
    /// Which setting family this record belongs to.
    pub kind: SettingKind,
    /// URI of the default-setting entity.
    pub setting: Uri,
}

/// Gateway to the partitioned graph store.
///
/// Writes and deletes go through an open transaction; uncommitted work must
/// not be visible to reads and must vanish on abort. Reads outside a
/// transaction see the last committed state.
pub trait StoreGateway: Send + Sync {
    /// Open a transaction scoped to the given partitions.
    fn begin(&self, partitions: &[Partition]) -> StratumResult<TxId>;

    /// Commit a transaction, applying its buffered writes atomically.
    ///
    /// A failed commit may leave the transaction open; callers abort it,
    /// and implementations that already consumed it on failure return
    /// `UnknownTransaction` from that abort.
    fn commit(&self, tx: TxId) -> StratumResult<()>;

    /// Abort a transaction, discarding its buffered writes.
    fn abort(&self, tx: TxId) -> StratumResult<()>;

    /// Physical graph identifier for a partition.
    fn resolve_partition(&self, partition: Partition) -> String;

    /// Read every resource of a type from one partition.
    fn read_all(&self, type_key: TypeKey, partition: Partition) -> StratumResult<Vec<EntityData>>;

    /// Read one resource, scanning the partitions in order. Returns the
    /// partition it was found in alongside the payload.
    fn read_entity(
        &self,
        uri: &Uri,
        partitions: &[Partition],
    ) -> StratumResult<Option<(Partition, EntityData)>>;

    /// Write a resource into one partition within a transaction.
    fn write_entity(
        &self,
        tx: TxId,
        partition: Partition,
        type_key: TypeKey,
        entity: &EntityData,
    ) -> StratumResult<()>;

    /// Delete a resource from every listed partition within a transaction.
    fn delete_entity(&self, tx: TxId, uri: &Uri, partitions: &[Partition]) -> StratumResult<()>;

    /// Write a raw edge fact into one partition within a transaction.
    fn write_link(&self, tx: TxId, partition: Partition, link: &LinkSpec) -> StratumResult<()>;

    /// Delete a raw edge fact from every listed partition within a transaction.
    fn delete_link(&self, tx: TxId, link: &LinkSpec, partitions: &[Partition])
        -> StratumResult<()>;

    /// Edge-existence check across partitions, used to avoid duplicate facts.
    fn link_exists(&self, link: &LinkSpec, partitions: &[Partition]) -> StratumResult<bool>;

    /// Scan subtype/subproperty declarations (subtype, supertype pairs).
    fn read_subtypes(&self, partition: Partition) -> StratumResult<Vec<(Uri, Uri)>>;

    /// Scan default-setting declarations.
    fn read_default_settings(
        &self,
        partition: Partition,
    ) -> StratumResult<Vec<DefaultSettingRecord>>;
}
