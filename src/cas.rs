//! Versioned cache facade.

use std::fmt;
use std::sync::Arc;
use txcache_core::{
    CacheError, CacheKey, CacheLookup, CacheResult, CacheValue, HasVersion, StatsSnapshot,
};
use txcache_engine::{BoxedTransaction, VersionedCache};

/// Versioned cache handle; cheap to clone.
///
/// Writes merge by version: the newest version wins regardless of arrival
/// order, and replaying a write is harmless.
pub struct CasCache<K, V> {
    inner: Arc<dyn VersionedCache<K, V>>,
}

impl<K, V> Clone for CasCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> CasCache<K, V>
where
    K: CacheKey,
    V: CacheValue + HasVersion,
{
    /// Wrap a backend implementation.
    pub fn new(inner: impl VersionedCache<K, V> + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Cache name
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Read `key`; tombstones read as `Absent`.
    pub fn get(&self, key: &K) -> CacheResult<CacheLookup<V>> {
        self.inner.get(key)
    }

    /// Write `value` at `version` unless a newer version is stored.
    pub fn write(&self, key: K, value: V, version: u64) -> CacheResult<bool> {
        self.inner.write(key, value, version)
    }

    /// Write `value` at its own version. An unversioned value is skipped and
    /// `Ok(false)` returned.
    pub fn put(&self, key: K, value: V) -> CacheResult<bool> {
        match value.version() {
            Some(version) => self.inner.write(key, value, version),
            None => {
                tracing::debug!(cache = %self.name(), %key, "unversioned value not cached");
                Ok(false)
            }
        }
    }

    /// Tombstone `key` at `version` unless a newer version is stored.
    pub fn evict_version(&self, key: K, version: u64) -> CacheResult<bool> {
        self.inner.evict_version(key, version)
    }

    /// Remove `key` regardless of version.
    pub fn evict(&self, key: &K) -> CacheResult<()> {
        self.inner.evict(key)
    }

    /// Remove several keys regardless of version.
    pub fn evict_many(&self, keys: &[K]) -> CacheResult<()> {
        self.inner.evict_many(keys)
    }

    /// Always fails with [`CacheError::UnsupportedOperation`].
    pub fn put_if_absent(&self, key: K, value: V) -> CacheResult<bool> {
        self.inner.put_if_absent(key, value)
    }

    /// Always fails with [`CacheError::UnsupportedOperation`].
    pub fn evict_or_put(&self, key: K, value: V) -> CacheResult<()> {
        self.inner.evict_or_put(key, value)
    }

    /// Open a transaction watching `key`.
    pub fn new_transaction_for_key(&self, key: &K) -> CacheResult<BoxedTransaction<K, V>> {
        self.inner.new_transaction_for_key(key)
    }

    /// Open a transaction watching `keys`.
    pub fn new_transaction_for_keys(&self, keys: &[K]) -> CacheResult<BoxedTransaction<K, V>> {
        self.inner.new_transaction_for_keys(keys)
    }

    /// Counter snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats()
    }

    /// Read-through: on a miss calls `fetch` and, when `put_to_cache` is set,
    /// writes the result at its own version.
    pub fn get_or_fetch<E, F>(&self, key: &K, fetch: F, put_to_cache: bool) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
        E: From<CacheError>,
    {
        if let CacheLookup::Present(value) = self.get(key)? {
            return Ok(Some(value));
        }
        let fetched = fetch()?;
        if put_to_cache {
            if let Some(value) = &fetched {
                self.put(key.clone(), value.clone())?;
            }
        }
        Ok(fetched)
    }
}

impl<K, V> fmt::Debug for CasCache<K, V>
where
    K: CacheKey,
    V: CacheValue + HasVersion,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CasCache").field("name", &self.name()).finish()
    }
}
