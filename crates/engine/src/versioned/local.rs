use std::fmt;
use std::sync::Arc;
use txcache_concurrency::{TransactionCoordinator, TransactionMetricsSnapshot};
use txcache_core::types::version_accepts;
use txcache_core::{
    CacheKey, CacheLookup, CacheResult, CacheSpecs, CacheStats, CacheValue, HasVersion,
    StatsSnapshot, VersionedEntry,
};
use txcache_storage::LocalStore;

use crate::traits::{BoxedTransaction, VersionedCache};
use crate::transaction::LocalTransaction;

fn versioned_weight<V: CacheValue>(entry: &VersionedEntry<V>) -> u32 {
    entry.value.as_ref().map_or(1, CacheValue::weight)
}

/// Local versioned cache.
///
/// The compare and the write run under the coordinator lock, which also
/// poisons ordinary transactions opened on this cache for the same key.
pub struct LocalVersionedCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    store: Arc<LocalStore<K, VersionedEntry<V>>>,
    coordinator: Arc<TransactionCoordinator<K, VersionedEntry<V>>>,
    stats: Arc<CacheStats>,
}

impl<K, V> LocalVersionedCache<K, V>
where
    K: CacheKey,
    V: CacheValue + HasVersion,
{
    /// Create a cache sized by `specs`.
    pub fn new(name: impl Into<String>, specs: &CacheSpecs) -> Self {
        let name = name.into();
        Self {
            store: Arc::new(LocalStore::new(name.clone(), specs, versioned_weight::<V>)),
            coordinator: Arc::new(TransactionCoordinator::new(name)),
            stats: Arc::new(CacheStats::new(specs.stats_enabled)),
        }
    }

    /// Version currently stored for `key`, tombstones included.
    pub fn stored_version(&self, key: &K) -> Option<u64> {
        self.store.get(key).map(|entry| entry.version)
    }

    /// Outcome counters of this cache's transactions
    pub fn transaction_metrics(&self) -> TransactionMetricsSnapshot {
        self.coordinator.metrics()
    }

    fn compare_and_set(&self, key: K, entry: VersionedEntry<V>) -> bool {
        let version = entry.version;
        let applied = self
            .coordinator
            .write_with(std::slice::from_ref(&key), || {
                let stored = self.store.get(&key).map(|current| current.version);
                if version_accepts(stored, version) {
                    self.store.put(key.clone(), entry);
                    true
                } else {
                    false
                }
            });
        if applied {
            self.stats.record_puts(1);
        } else {
            tracing::debug!(cache = %self.store.name(), %key, version, "stale versioned write ignored");
        }
        applied
    }
}

impl<K, V> VersionedCache<K, V> for LocalVersionedCache<K, V>
where
    K: CacheKey,
    V: CacheValue + HasVersion,
{
    fn name(&self) -> &str {
        self.store.name()
    }

    fn get(&self, key: &K) -> CacheResult<CacheLookup<V>> {
        let lookup = match self.store.get(key).and_then(|entry| entry.value) {
            Some(value) => CacheLookup::Present(value),
            None => CacheLookup::Absent,
        };
        self.stats.record_read(lookup.is_cached());
        Ok(lookup)
    }

    fn write(&self, key: K, value: V, version: u64) -> CacheResult<bool> {
        Ok(self.compare_and_set(key, VersionedEntry::new(value, version)))
    }

    fn evict_version(&self, key: K, version: u64) -> CacheResult<bool> {
        Ok(self.compare_and_set(key, VersionedEntry::tombstone(version)))
    }

    fn evict(&self, key: &K) -> CacheResult<()> {
        self.coordinator
            .write_with(std::slice::from_ref(key), || self.store.evict(key));
        self.stats.record_evictions(1);
        Ok(())
    }

    fn evict_many(&self, keys: &[K]) -> CacheResult<()> {
        self.coordinator
            .write_with(keys, || self.store.evict_many(keys));
        self.stats.record_evictions(keys.len() as u64);
        Ok(())
    }

    fn new_transaction_for_keys(&self, keys: &[K]) -> CacheResult<BoxedTransaction<K, V>> {
        Ok(Box::new(LocalTransaction::begin(
            keys,
            Arc::clone(&self.coordinator),
            Arc::clone(&self.store),
            Arc::clone(&self.stats),
            super::stamp::<V>,
        )))
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<K, V> fmt::Debug for LocalVersionedCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalVersionedCache")
            .field("store", &self.store)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
