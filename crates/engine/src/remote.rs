//! Redis-backed transactional cache.
//!
//! No in-process coordination: direct writes go straight to Redis, and any
//! transaction that WATCHed a touched key fails at EXEC.

use std::fmt;
use std::sync::Arc;
use txcache_core::codec::{decode_entry, encode_entry};
use txcache_core::{
    CacheCodec, CacheKey, CacheLookup, CacheResult, CacheStats, CacheValue, StatsSnapshot,
};
use txcache_storage::RemoteStore;

use crate::traits::{BoxedTransaction, TransactionalCache};
use crate::transaction::RemoteCacheTransaction;

/// Remote cache storing codec bytes, or the empty marker for `None`.
pub struct RemoteTransactionalCache<K, V> {
    store: Arc<RemoteStore>,
    codec: Arc<dyn CacheCodec<V>>,
    stats: Arc<CacheStats>,
    _key: std::marker::PhantomData<fn(K)>,
}

impl<K, V> RemoteTransactionalCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    /// Wrap a namespace handle with a codec.
    pub fn new(store: RemoteStore, codec: Arc<dyn CacheCodec<V>>, stats_enabled: bool) -> Self {
        Self {
            store: Arc::new(store),
            codec,
            stats: Arc::new(CacheStats::new(stats_enabled)),
            _key: std::marker::PhantomData,
        }
    }

    fn encode(&self, value: Option<&V>) -> CacheResult<Vec<u8>> {
        encode_entry(self.codec.as_ref(), value)
    }
}

impl<K, V> TransactionalCache<K, V> for RemoteTransactionalCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn name(&self) -> &str {
        self.store.name()
    }

    fn get(&self, key: &K) -> CacheResult<CacheLookup<V>> {
        let key = key.to_string();
        let lookup = match self.store.get(&key)? {
            None => CacheLookup::Absent,
            Some(bytes) => CacheLookup::from_entry(Some(decode_entry(
                self.codec.as_ref(),
                &key,
                &bytes,
            )?)),
        };
        self.stats.record_read(lookup.is_cached());
        Ok(lookup)
    }

    fn put(&self, key: K, value: Option<V>) -> CacheResult<()> {
        let bytes = self.encode(value.as_ref())?;
        self.store.set(&key.to_string(), &bytes)?;
        self.stats.record_puts(1);
        Ok(())
    }

    fn put_if_absent(&self, key: K, value: Option<V>) -> CacheResult<bool> {
        let bytes = self.encode(value.as_ref())?;
        let inserted = self.store.set_nx(&key.to_string(), &bytes)?;
        if inserted {
            self.stats.record_puts(1);
        }
        Ok(inserted)
    }

    fn evict(&self, key: &K) -> CacheResult<()> {
        self.store.del(&[key.to_string().as_str()])?;
        self.stats.record_evictions(1);
        Ok(())
    }

    fn evict_many(&self, keys: &[K]) -> CacheResult<()> {
        let names: Vec<String> = keys.iter().map(ToString::to_string).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        self.store.del(&refs)?;
        self.stats.record_evictions(keys.len() as u64);
        Ok(())
    }

    fn evict_or_put(&self, key: K, value: Option<V>) -> CacheResult<()> {
        let bytes = self.encode(value.as_ref())?;
        let placed = self.store.evict_or_put(&key.to_string(), &bytes)?;
        self.stats.record_evictions(1);
        if placed {
            tracing::debug!(cache = %self.store.name(), %key, "evicted absent key, placeholder written");
        }
        Ok(())
    }

    fn new_transaction_for_keys(&self, keys: &[K]) -> CacheResult<BoxedTransaction<K, V>> {
        Ok(Box::new(RemoteCacheTransaction::begin(
            keys,
            Arc::clone(&self.store),
            Arc::clone(&self.codec),
            Arc::clone(&self.stats),
            encode_entry::<V>,
        )?))
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<K, V> fmt::Debug for RemoteTransactionalCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTransactionalCache")
            .field("store", &self.store)
            .finish()
    }
}
