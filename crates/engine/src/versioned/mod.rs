//! Version-stamped caches.
//!
//! Every write carries the source of truth's version and is merged by
//! [`version_accepts`](txcache_core::types::version_accepts): applied iff
//! nothing is stored or the incoming version is at least the stored one.
//! A versioned eviction is a tombstone write, so a late eviction cannot
//! destroy a newer value. Tombstones expire with the ordinary TTL only.

mod local;
mod remote;

pub use local::LocalVersionedCache;
pub use remote::RemoteVersionedCache;

use txcache_core::{HasVersion, VersionedEntry};

/// Stamp a buffered transaction value with its own version (0 if none).
pub(crate) fn stamp<V: HasVersion>(value: Option<V>) -> VersionedEntry<V> {
    let version = value.as_ref().and_then(HasVersion::version).unwrap_or(0);
    VersionedEntry { version, value }
}
