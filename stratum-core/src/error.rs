//! Error types for Stratum operations.

use crate::partition::Partition;
use crate::registry::TypeKey;
use crate::uri::Uri;
use thiserror::Error;

/// Cache layer errors: caller contract violations and data integrity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Null entity passed to {operation}")]
    NullEntity { operation: &'static str },

    #[error("Type key {type_key} not supported by {operation}")]
    UnsupportedTypeKey {
        type_key: TypeKey,
        operation: &'static str,
    },

    #[error("Duplicate URI {uri} for a unique key in partition {partition}")]
    DuplicateUri { uri: Uri, partition: Partition },

    #[error("Type key {type_key} may not reside in partition {partition}")]
    IllegalResidency {
        type_key: TypeKey,
        partition: Partition,
    },

    #[error("Session not initialized: call init() before get/store/delete")]
    NotInitialized,

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Store gateway errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to begin transaction over {partitions:?}: {reason}")]
    BeginFailed {
        partitions: Vec<Partition>,
        reason: String,
    },

    #[error("Transaction {tx_id} failed to commit: {reason}")]
    CommitFailed { tx_id: u64, reason: String },

    #[error("Unknown transaction id {tx_id}")]
    UnknownTransaction { tx_id: u64 },

    #[error("Read failed in partition {partition}: {reason}")]
    ReadFailed { partition: Partition, reason: String },

    #[error("Write failed for {uri} in partition {partition}: {reason}")]
    WriteFailed {
        uri: Uri,
        partition: Partition,
        reason: String,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Synchronization failures. Fatal for the unit of work; the cache is not
/// rolled back, by design, since it is the source of truth for a retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error("Delete phase failed, transaction aborted: {reason}")]
    DeletePhaseFailed { reason: String },

    #[error(
        "Store phase failed for partition {partition} (partitions {committed:?} already committed): {reason}"
    )]
    StorePhaseFailed {
        partition: Partition,
        /// Partitions whose store phase committed before the failure.
        committed: Vec<Partition>,
        reason: String,
    },
}

/// Master error type for all Stratum errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StratumError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Result type alias for Stratum operations.
pub type StratumResult<T> = Result<T, StratumError>;

// =============================================================================
// TESTS
// =============================================================================
