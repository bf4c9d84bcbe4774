//! Stratum Cache - Entity Cache and Synchronization Engine
//!
//! The write-back cache sitting in front of the partitioned graph store.
//! Reads are answered from memory whenever validity tracking allows;
//! mutations touch only the cache and its staging sets until [`Session::sync`]
//! flushes them through the store gateway, one transaction per phase.

pub mod cache;
pub mod defaults;
pub mod hierarchy;
pub mod relindex;
pub mod repair;
pub mod session;
pub mod sync;

pub use cache::EntityCache;
pub use defaults::DefaultSettingResolver;
pub use hierarchy::TypeHierarchy;
pub use relindex::RelationshipIndex;
pub use session::Session;
pub use sync::{SyncEngine, SyncReport};
