//! In-process transactional cache.
//!
//! Direct writes go through the coordinator so they poison the open
//! transactions watching the same keys. `evict_or_put` is a plain evict:
//! poisoning already closes the miss-then-evict race locally.

use std::fmt;
use std::sync::Arc;
use txcache_concurrency::{TransactionCoordinator, TransactionMetricsSnapshot};
use txcache_core::{
    CacheKey, CacheLookup, CacheResult, CacheSpecs, CacheStats, CacheValue, StatsSnapshot,
};
use txcache_storage::LocalStore;

use crate::traits::{BoxedTransaction, TransactionalCache};
use crate::transaction::LocalTransaction;

/// Weight of a plain entry; the explicit-empty marker weighs 1.
pub(crate) fn plain_weight<V: CacheValue>(entry: &Option<V>) -> u32 {
    entry.as_ref().map_or(1, CacheValue::weight)
}

fn identity<V>(value: Option<V>) -> Option<V> {
    value
}

/// Local cache storing `Option<V>` (`None` = explicit empty).
pub struct LocalTransactionalCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    store: Arc<LocalStore<K, Option<V>>>,
    coordinator: Arc<TransactionCoordinator<K, Option<V>>>,
    stats: Arc<CacheStats>,
}

impl<K, V> LocalTransactionalCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    /// Create a cache sized by `specs`.
    pub fn new(name: impl Into<String>, specs: &CacheSpecs) -> Self {
        let name = name.into();
        Self {
            store: Arc::new(LocalStore::new(name.clone(), specs, plain_weight::<V>)),
            coordinator: Arc::new(TransactionCoordinator::new(name)),
            stats: Arc::new(CacheStats::new(specs.stats_enabled)),
        }
    }

    /// Outcome counters of this cache's transactions
    pub fn transaction_metrics(&self) -> TransactionMetricsSnapshot {
        self.coordinator.metrics()
    }

    /// Open transactions watching `key`
    pub fn watchers(&self, key: &K) -> usize {
        self.coordinator.watchers(key)
    }

    /// Flush pending capacity/TTL maintenance
    pub fn run_pending_tasks(&self) {
        self.store.run_pending_tasks();
    }
}

impl<K, V> TransactionalCache<K, V> for LocalTransactionalCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn name(&self) -> &str {
        self.store.name()
    }

    fn get(&self, key: &K) -> CacheResult<CacheLookup<V>> {
        let lookup = CacheLookup::from_entry(self.store.get(key));
        self.stats.record_read(lookup.is_cached());
        Ok(lookup)
    }

    fn put(&self, key: K, value: Option<V>) -> CacheResult<()> {
        self.coordinator
            .write_with(std::slice::from_ref(&key), || self.store.put(key.clone(), value));
        self.stats.record_puts(1);
        Ok(())
    }

    fn put_if_absent(&self, key: K, value: Option<V>) -> CacheResult<bool> {
        let inserted = self
            .coordinator
            .write_with(std::slice::from_ref(&key), || {
                self.store.put_if_absent(key.clone(), value)
            });
        if inserted {
            self.stats.record_puts(1);
        }
        Ok(inserted)
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

    fn evict_or_put(&self, key: K, _value: Option<V>) -> CacheResult<()> {
        self.evict(&key)
    }

    fn new_transaction_for_keys(&self, keys: &[K]) -> CacheResult<BoxedTransaction<K, V>> {
        Ok(Box::new(LocalTransaction::begin(
            keys,
            Arc::clone(&self.coordinator),
            Arc::clone(&self.store),
            Arc::clone(&self.stats),
            identity::<V>,
        )))
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<K, V> fmt::Debug for LocalTransactionalCache<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTransactionalCache")
            .field("store", &self.store)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}
