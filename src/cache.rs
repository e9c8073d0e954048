//! Plain cache facade.

use std::fmt;
use std::sync::Arc;
use txcache_core::{CacheError, CacheKey, CacheLookup, CacheResult, CacheValue, StatsSnapshot};
use txcache_engine::{BoxedTransaction, TransactionalCache};

/// Cache handle; cheap to clone, backend hidden behind
/// [`TransactionalCache`].
///
/// # Read-through
///
/// ```ignore
/// let device = devices.get_and_put_in_transaction(&id, || dao.find(&id), false)?;
/// ```
///
/// On a miss the fetch runs inside a transaction over `id`; if the device is
/// evicted or overwritten meanwhile, the fetched value is returned but not
/// cached.
pub struct Cache<K, V> {
    inner: Arc<dyn TransactionalCache<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    /// Wrap a backend implementation.
    pub fn new(inner: impl TransactionalCache<K, V> + 'static) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Cache name
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Read `key`.
    pub fn get(&self, key: &K) -> CacheResult<CacheLookup<V>> {
        self.inner.get(key)
    }

    /// Store unconditionally (`None` = explicit empty).
    pub fn put(&self, key: K, value: Option<V>) -> CacheResult<()> {
        self.inner.put(key, value)
    }

    /// Store only if nothing is cached.
    pub fn put_if_absent(&self, key: K, value: Option<V>) -> CacheResult<bool> {
        self.inner.put_if_absent(key, value)
    }

    /// Remove `key`.
    pub fn evict(&self, key: &K) -> CacheResult<()> {
        self.inner.evict(key)
    }

    /// Remove several keys.
    pub fn evict_many(&self, keys: &[K]) -> CacheResult<()> {
        self.inner.evict_many(keys)
    }

    /// Remove `key`, leaving `value` behind briefly on the remote backend if
    /// nothing was there.
    pub fn evict_or_put(&self, key: K, value: Option<V>) -> CacheResult<()> {
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

    /// Transactional read-through.
    ///
    /// Returns the cached value (or cached empty) when present. Otherwise
    /// opens a transaction over `key`, calls `fetch`, and commits the result
    /// when it is `Some` or `cache_empty` is set. A lost commit is not an
    /// error: the fetched value is still returned. If `fetch` fails the
    /// transaction is rolled back and the error returned.
    pub fn get_and_put_in_transaction<E, F>(
        &self,
        key: &K,
        fetch: F,
        cache_empty: bool,
    ) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
        E: From<CacheError>,
    {
        if let Some(cached) = self.get(key)?.into_cached() {
            return Ok(cached);
        }
        let mut txn = self.new_transaction_for_key(key)?;
        let fetched = match fetch() {
            Ok(fetched) => fetched,
            Err(err) => {
                if let Err(rollback_err) = txn.rollback() {
                    tracing::warn!(cache = %self.name(), %key, error = %rollback_err, "rollback after failed fetch");
                }
                return Err(err);
            }
        };
        if fetched.is_some() || cache_empty {
            txn.put_if_absent(key.clone(), fetched.clone())?;
            if !txn.commit()? {
                tracing::debug!(cache = %self.name(), %key, "read-through lost to a concurrent write");
            }
        } else {
            txn.rollback()?;
        }
        Ok(fetched)
    }

    /// Non-transactional read-through.
    ///
    /// On a miss calls `fetch`; when `put_to_cache` is set, stores the result
    /// if it is `Some` or `cache_empty` is set.
    pub fn get_or_fetch<E, F>(
        &self,
        key: &K,
        fetch: F,
        cache_empty: bool,
        put_to_cache: bool,
    ) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Result<Option<V>, E>,
        E: From<CacheError>,
    {
        if let Some(cached) = self.get(key)?.into_cached() {
            return Ok(cached);
        }
        let fetched = fetch()?;
        if put_to_cache && (fetched.is_some() || cache_empty) {
            self.put(key.clone(), fetched.clone())?;
        }
        Ok(fetched)
    }
}

impl<K, V> fmt::Debug for Cache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").field("name", &self.name()).finish()
    }
}
