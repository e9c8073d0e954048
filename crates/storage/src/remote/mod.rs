//! Shared Redis store.
//!
//! Entries are addressed by `cache name ‖ key`. Plain entries hold codec
//! bytes (or [`NULL_MARKER`](txcache_core::NULL_MARKER) for an explicit
//! empty); versioned entries hold `version (u64 BE) ‖ payload`.
//!
//! Conflict detection for transactions is Redis' own WATCH/MULTI/EXEC, so
//! this module keeps no in-process transaction state.

mod pool;
mod script;
mod store;
mod transaction;

pub use pool::{ConnectionPool, PooledConnection};
pub use script::{
    frame_versioned, split_versioned, VERSIONED_SET_SCRIPT, VERSIONED_SET_SHA, VERSION_PREFIX_LEN,
};
pub use store::RemoteStore;
pub use transaction::RemoteTransaction;

use txcache_core::CacheError;

/// Map a Redis failure into the cache error space.
pub(crate) fn remote_error(err: redis::RedisError) -> CacheError {
    CacheError::Remote(err.to_string())
}

/// Store address of `key` in cache `name`.
pub(crate) fn raw_key(name: &str, key: &str) -> Vec<u8> {
    let mut raw = Vec::with_capacity(name.len() + key.len());
    raw.extend_from_slice(name.as_bytes());
    raw.extend_from_slice(key.as_bytes());
    raw
}
