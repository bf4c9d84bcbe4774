//! Stratum Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no cache or store logic.

pub mod config;
pub mod entity;
pub mod error;
pub mod partition;
pub mod registry;
pub mod uri;

pub use config::SessionConfig;
pub use entity::{Entity, EntityData, LinkSpec, new_entity};
pub use error::{CacheError, StoreError, StratumError, StratumResult, SyncError};
pub use partition::{Partition, PartitionSet};
pub use registry::{DomainKind, EntityKind, SettingKind, TypeKey, TypeRegistry};
pub use uri::{canonical_relationship_uri, Uri};
