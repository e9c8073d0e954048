//! Cache interfaces shared by every backend.
//!
//! Backend × versioning combinations are selected once, at construction,
//! and used through these traits:
//!
//! | | Local | Remote |
//! |---|---|---|
//! | plain | [`LocalTransactionalCache`](crate::LocalTransactionalCache) | [`RemoteTransactionalCache`](crate::RemoteTransactionalCache) |
//! | versioned | [`LocalVersionedCache`](crate::LocalVersionedCache) | [`RemoteVersionedCache`](crate::RemoteVersionedCache) |

use txcache_core::error::unsupported_on_versioned;
use txcache_core::{CacheLookup, CacheResult, StatsSnapshot, TransactionId, TransactionStatus};

/// An open optimistic transaction.
///
/// Writes are buffered until [`commit`](Self::commit). Dropping an open
/// transaction rolls it back.
pub trait CacheTransaction<K, V>: Send {
    /// Transaction id
    fn id(&self) -> TransactionId;

    /// Current state
    fn status(&self) -> TransactionStatus;

    /// Buffer `value` (`None` = explicit empty) for `key`.
    ///
    /// Applied at commit only if nothing is stored under `key` by then. A
    /// `key` outside the watch set is watched from this call on.
    fn put_if_absent(&mut self, key: K, value: Option<V>) -> CacheResult<()>;

    /// Apply buffered writes unless a watched key changed.
    ///
    /// `Ok(false)` is the normal outcome of losing a race: proceed without
    /// having cached the value.
    fn commit(&mut self) -> CacheResult<bool>;

    /// Discard buffered writes. A no-op once resolved.
    fn rollback(&mut self) -> CacheResult<()>;
}

/// Boxed transaction handle returned by the caches.
pub type BoxedTransaction<K, V> = Box<dyn CacheTransaction<K, V>>;

/// Cache with explicit negative caching and optimistic transactions.
pub trait TransactionalCache<K, V>: Send + Sync {
    /// Cache name
    fn name(&self) -> &str;

    /// Read `key`.
    fn get(&self, key: &K) -> CacheResult<CacheLookup<V>>;

    /// Store unconditionally (`None` = explicit empty).
    fn put(&self, key: K, value: Option<V>) -> CacheResult<()>;

    /// Store only if nothing is cached. Returns `true` if stored.
    fn put_if_absent(&self, key: K, value: Option<V>) -> CacheResult<bool>;

    /// Remove `key`.
    fn evict(&self, key: &K) -> CacheResult<()>;

    /// Remove several keys.
    fn evict_many(&self, keys: &[K]) -> CacheResult<()>;

    /// Remove `key`; where the backend needs it, leave `value` behind with a
    /// short TTL when nothing was removed.
    fn evict_or_put(&self, key: K, value: Option<V>) -> CacheResult<()>;

    /// Open a transaction watching `keys`.
    fn new_transaction_for_keys(&self, keys: &[K]) -> CacheResult<BoxedTransaction<K, V>>;

    /// Open a transaction watching one key.
    fn new_transaction_for_key(&self, key: &K) -> CacheResult<BoxedTransaction<K, V>> {
        self.new_transaction_for_keys(std::slice::from_ref(key))
    }

    /// Counter snapshot (zeros when stats are disabled)
    fn stats(&self) -> StatsSnapshot;
}

/// Cache whose entries carry a source version and merge by compare-and-swap.
pub trait VersionedCache<K, V>: Send + Sync {
    /// Cache name
    fn name(&self) -> &str;

    /// Read `key`. Tombstones read as `Absent`; `Empty` is never returned.
    fn get(&self, key: &K) -> CacheResult<CacheLookup<V>>;

    /// Write `value` at `version` iff nothing is stored or
    /// `version >= stored`. Returns `true` when applied.
    fn write(&self, key: K, value: V, version: u64) -> CacheResult<bool>;

    /// Leave a tombstone at `version` under the same rule as [`write`](Self::write).
    fn evict_version(&self, key: K, version: u64) -> CacheResult<bool>;

    /// Remove `key` regardless of version.
    fn evict(&self, key: &K) -> CacheResult<()>;

    /// Remove several keys regardless of version.
    fn evict_many(&self, keys: &[K]) -> CacheResult<()>;

    /// Not defined for versioned caches.
    fn put_if_absent(&self, _key: K, _value: V) -> CacheResult<bool> {
        Err(unsupported_on_versioned("put_if_absent", self.name()))
    }

    /// Not defined for versioned caches.
    fn evict_or_put(&self, _key: K, _value: V) -> CacheResult<()> {
        Err(unsupported_on_versioned("evict_or_put", self.name()))
    }

    /// Open a transaction watching `keys`. Buffered values are stamped with
    /// their own version (0 when unversioned).
    fn new_transaction_for_keys(&self, keys: &[K]) -> CacheResult<BoxedTransaction<K, V>>;

    /// Open a transaction watching one key.
    fn new_transaction_for_key(&self, key: &K) -> CacheResult<BoxedTransaction<K, V>> {
        self.new_transaction_for_keys(std::slice::from_ref(key))
    }

    /// Counter snapshot (zeros when stats are disabled)
    fn stats(&self) -> StatsSnapshot;
}
