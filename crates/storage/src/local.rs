//! In-process backing store.
//!
//! Wraps a `moka` cache bounded by total weight and expiring entries a fixed
//! TTL after insertion. The eviction policy itself belongs to moka.
//!
//! # Entry types
//!
//! The store is generic over the stored entry `E`:
//! - plain caches store `Option<V>` (`None` = explicit-empty marker)
//! - versioned caches store `VersionedEntry<V>`
//!
//! # Thread Safety
//!
//! Every operation is individually atomic. Composite read-compare-write
//! sequences (versioned CAS, commit) are serialized by the namespace's
//! transaction coordinator, not here.

use moka::sync::Cache;
use std::fmt;
use txcache_core::{CacheKey, CacheSpecs};

/// Weigher applied to every stored entry
pub type Weigher<E> = fn(&E) -> u32;

/// Bounded, TTL-expiring local store for one cache namespace.
pub struct LocalStore<K, E> {
    name: String,
    cache: Cache<K, E>,
}

impl<K, E> LocalStore<K, E>
where
    K: CacheKey,
    E: Clone + Send + Sync + 'static,
{
    /// Create a store sized by `specs`.
    ///
    /// # Arguments
    ///
    /// * `name` - Cache name, used in logs
    /// * `specs` - Capacity (total weight) and TTL
    /// * `weigher` - Capacity units consumed by one entry
    pub fn new(name: impl Into<String>, specs: &CacheSpecs, weigher: Weigher<E>) -> Self {
        let name = name.into();
        let mut builder = Cache::builder().name(&name);
        if let Some(capacity) = specs.capacity() {
            builder = builder
                .max_capacity(capacity)
                .weigher(move |_key: &K, entry: &E| weigher(entry));
        }
        if let Some(ttl) = specs.time_to_live() {
            builder = builder.time_to_live(ttl);
        }
        Self {
            name,
            cache: builder.build(),
        }
    }

    /// Cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a copy of the stored entry.
    #[inline]
    pub fn get(&self, key: &K) -> Option<E> {
        self.cache.get(key)
    }

    /// Store unconditionally.
    #[inline]
    pub fn put(&self, key: K, entry: E) {
        self.cache.insert(key, entry);
    }

    /// Store only if nothing is currently stored.
    ///
    /// Returns `true` if the entry was inserted.
    #[inline]
    pub fn put_if_absent(&self, key: K, entry: E) -> bool {
        self.cache.entry(key).or_insert_with(|| entry).is_fresh()
    }

    /// Remove one key.
    #[inline]
    pub fn evict(&self, key: &K) {
        self.cache.invalidate(key);
    }

    /// Remove several keys.
    pub fn evict_many(&self, keys: &[K]) {
        for key in keys {
            self.cache.invalidate(key);
        }
    }

    /// Check if a key is stored.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.cache.contains_key(key)
    }

    /// Approximate number of entries.
    ///
    /// Call [`run_pending_tasks`](Self::run_pending_tasks) first for an
    /// exact figure.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Approximate total weight.
    pub fn weighted_size(&self) -> u64 {
        self.cache.weighted_size()
    }

    /// Apply pending evictions and expirations now.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl<K, E> fmt::Debug for LocalStore<K, E>
where
    K: CacheKey,
    E: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalStore")
            .field("name", &self.name)
            .field("entry_count", &self.entry_count())
            .field("weighted_size", &self.weighted_size())
            .finish()
    }
}
