use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use txcache_core::codec::encode_entry;
use txcache_core::{
    CacheCodec, CacheKey, CacheLookup, CacheResult, CacheStats, CacheValue, HasVersion,
    StatsSnapshot,
};
use txcache_storage::{frame_versioned, RemoteStore};

use crate::traits::{BoxedTransaction, VersionedCache};
use crate::transaction::RemoteCacheTransaction;

/// Transactional blob for a versioned cache: the value's own version, then
/// the payload (empty for `None`, which reads back as absent).
fn encode_versioned<V: HasVersion>(
    codec: &dyn CacheCodec<V>,
    value: Option<&V>,
) -> CacheResult<Vec<u8>> {
    let version = value.and_then(HasVersion::version).unwrap_or(0);
    let payload = match value {
        Some(v) => encode_entry(codec, Some(v))?,
        None => Vec::new(),
    };
    Ok(frame_versioned(version, &payload))
}

/// Redis versioned cache; the compare-and-swap runs server-side.
pub struct RemoteVersionedCache<K, V> {
    store: Arc<RemoteStore>,
    codec: Arc<dyn CacheCodec<V>>,
    stats: Arc<CacheStats>,
    _key: PhantomData<fn(K)>,
}

impl<K, V> RemoteVersionedCache<K, V>
where
    K: CacheKey,
    V: CacheValue + HasVersion,
{
    /// Wrap a namespace handle with a codec.
    pub fn new(store: RemoteStore, codec: Arc<dyn CacheCodec<V>>, stats_enabled: bool) -> Self {
        Self {
            store: Arc::new(store),
            codec,
            stats: Arc::new(CacheStats::new(stats_enabled)),
            _key: PhantomData,
        }
    }

    fn cas(&self, key: &K, payload: &[u8], version: u64) -> CacheResult<bool> {
        let applied = self.store.versioned_set(&key.to_string(), payload, version)?;
        if applied {
            self.stats.record_puts(1);
        }
        Ok(applied)
    }
}

impl<K, V> VersionedCache<K, V> for RemoteVersionedCache<K, V>
where
    K: CacheKey,
    V: CacheValue + HasVersion,
{
    fn name(&self) -> &str {
        self.store.name()
    }

    fn get(&self, key: &K) -> CacheResult<CacheLookup<V>> {
        let key = key.to_string();
        let lookup = match self.store.get_versioned(&key)? {
            Some(payload) => CacheLookup::Present(self.codec.deserialize(&key, &payload)?),
            None => CacheLookup::Absent,
        };
        self.stats.record_read(lookup.is_cached());
        Ok(lookup)
    }

    fn write(&self, key: K, value: V, version: u64) -> CacheResult<bool> {
        let payload = encode_entry(self.codec.as_ref(), Some(&value))?;
        self.cas(&key, &payload, version)
    }

    fn evict_version(&self, key: K, version: u64) -> CacheResult<bool> {
        self.cas(&key, &[], version)
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

    fn new_transaction_for_keys(&self, keys: &[K]) -> CacheResult<BoxedTransaction<K, V>> {
        Ok(Box::new(RemoteCacheTransaction::begin(
            keys,
            Arc::clone(&self.store),
            Arc::clone(&self.codec),
            Arc::clone(&self.stats),
            encode_versioned::<V>,
        )?))
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<K, V> fmt::Debug for RemoteVersionedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteVersionedCache")
            .field("store", &self.store)
            .finish()
    }
}
