//! # txcache
//!
//! Transactional cache-consistency layer over an in-process cache or a
//! shared Redis store.
//!
//! txcache closes the read-through race: a value fetched after a cache miss
//! is only cached if nothing evicted or overwrote the key while it was being
//! fetched.
//!
//! ## Quick Start
//!
//! ```ignore
//! use txcache::prelude::*;
//!
//! let manager = CacheManager::from_file("cache.toml")?;
//! let devices: Cache<String, Device> = manager.build_cache("device-by-id")?;
//!
//! // Read-through guarded by an optimistic transaction
//! let device = devices.get_and_put_in_transaction(&id, || dao.find(&id), true)?;
//!
//! // The device was deleted: in-flight read-throughs of it will not commit
//! devices.evict(&id)?;
//! ```
//!
//! ## Caches
//!
//! - [`Cache`] - plain cache with explicit negative caching
//! - [`CasCache`] - version-stamped cache, newest version wins
//!
//! Both come from a [`CacheManager`], which selects the backend once from
//! configuration.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cache;
mod cas;
mod manager;

pub mod prelude;

// Re-export main entry points
pub use cache::Cache;
pub use cas::CasCache;
pub use manager::CacheManager;

// Re-export core vocabulary
pub use txcache_core::{
    BackendConfig, CacheCodec, CacheConfig, CacheError, CacheKey, CacheLookup, CacheResult,
    CacheSpecs, CacheValue, CodecKind, HasVersion, RemoteSettings, StatsSnapshot, TransactionId,
    TransactionStatus, VersionedEntry,
};

// Re-export transaction handles
pub use txcache_engine::{BoxedTransaction, CacheTransaction};
