//! Transaction handles for both backends.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use txcache_concurrency::TransactionCoordinator;
use txcache_core::{
    CacheCodec, CacheError, CacheKey, CacheResult, CacheStats, TransactionId, TransactionStatus,
};
use txcache_storage::{LocalStore, RemoteStore, RemoteTransaction};

use crate::traits::CacheTransaction;

/// Converts a buffered value into the stored entry type.
pub(crate) type ToEntry<V, E> = fn(Option<V>) -> E;

/// Encodes a buffered value into the remote blob format.
pub(crate) type EncodeBlob<V> = fn(&dyn CacheCodec<V>, Option<&V>) -> CacheResult<Vec<u8>>;

fn not_active(id: TransactionId, state: TransactionStatus) -> CacheError {
    CacheError::TransactionNotActive { id, state }
}

// ============================================================================
// Local
// ============================================================================

/// Transaction on a local cache, coordinated in-process.
pub struct LocalTransaction<K, V, E>
where
    K: CacheKey,
    E: Clone + Send + Sync + 'static,
{
    id: TransactionId,
    status: TransactionStatus,
    coordinator: Arc<TransactionCoordinator<K, E>>,
    store: Arc<LocalStore<K, E>>,
    stats: Arc<CacheStats>,
    to_entry: ToEntry<V, E>,
    _value: PhantomData<fn(V)>,
}

impl<K, V, E> LocalTransaction<K, V, E>
where
    K: CacheKey,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn begin(
        keys: &[K],
        coordinator: Arc<TransactionCoordinator<K, E>>,
        store: Arc<LocalStore<K, E>>,
        stats: Arc<CacheStats>,
        to_entry: ToEntry<V, E>,
    ) -> Self {
        let id = coordinator.begin(keys);
        Self {
            id,
            status: TransactionStatus::Open,
            coordinator,
            store,
            stats,
            to_entry,
            _value: PhantomData,
        }
    }
}

impl<K, V, E> CacheTransaction<K, V> for LocalTransaction<K, V, E>
where
    K: CacheKey,
    V: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn id(&self) -> TransactionId {
        self.id
    }

    fn status(&self) -> TransactionStatus {
        self.status
    }

    fn put_if_absent(&mut self, key: K, value: Option<V>) -> CacheResult<()> {
        if !self.status.is_open() {
            return Err(not_active(self.id, self.status));
        }
        let entry = (self.to_entry)(value);
        if !self.coordinator.buffer(self.id, key, entry) {
            // Deregistered behind our back; treat as lost.
            self.status = TransactionStatus::Aborted;
            return Err(not_active(self.id, self.status));
        }
        Ok(())
    }

    fn commit(&mut self) -> CacheResult<bool> {
        if !self.status.is_open() {
            return Err(not_active(self.id, self.status));
        }
        match self.coordinator.commit(self.id, &self.store) {
            txcache_concurrency::CommitOutcome::Committed { applied } => {
                self.status = TransactionStatus::Committed;
                self.stats.record_puts(applied as u64);
                Ok(true)
            }
            txcache_concurrency::CommitOutcome::Aborted => {
                self.status = TransactionStatus::Aborted;
                Ok(false)
            }
        }
    }

    fn rollback(&mut self) -> CacheResult<()> {
        if self.status.is_open() {
            self.coordinator.rollback(self.id);
            self.status = TransactionStatus::RolledBack;
        }
        Ok(())
    }
}

impl<K, V, E> Drop for LocalTransaction<K, V, E>
where
    K: CacheKey,
    E: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.status.is_open() {
            self.coordinator.rollback(self.id);
            self.status = TransactionStatus::RolledBack;
        }
    }
}

impl<K, V, E> fmt::Debug for LocalTransaction<K, V, E>
where
    K: CacheKey,
    E: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTransaction")
            .field("id", &self.id)
            .field("cache", &self.coordinator.name())
            .field("status", &self.status)
            .finish()
    }
}

// ============================================================================
// Remote
// ============================================================================

/// Transaction on a remote cache: Redis WATCH/MULTI/EXEC with encoding.
pub struct RemoteCacheTransaction<K, V> {
    inner: RemoteTransaction,
    store: Arc<RemoteStore>,
    codec: Arc<dyn CacheCodec<V>>,
    stats: Arc<CacheStats>,
    encode: EncodeBlob<V>,
    _key: PhantomData<fn(K)>,
}

impl<K: CacheKey, V> RemoteCacheTransaction<K, V> {
    pub(crate) fn begin(
        keys: &[K],
        store: Arc<RemoteStore>,
        codec: Arc<dyn CacheCodec<V>>,
        stats: Arc<CacheStats>,
        encode: EncodeBlob<V>,
    ) -> CacheResult<Self> {
        let names: Vec<String> = keys.iter().map(ToString::to_string).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let inner = store.begin_transaction(&refs)?;
        Ok(Self {
            inner,
            store,
            codec,
            stats,
            encode,
            _key: PhantomData,
        })
    }
}

impl<K, V> CacheTransaction<K, V> for RemoteCacheTransaction<K, V>
where
    K: CacheKey,
    V: Send + Sync + 'static,
{
    fn id(&self) -> TransactionId {
        self.inner.id()
    }

    fn status(&self) -> TransactionStatus {
        self.inner.status()
    }

    fn put_if_absent(&mut self, key: K, value: Option<V>) -> CacheResult<()> {
        let bytes = (self.encode)(self.codec.as_ref(), value.as_ref())?;
        let raw = self.store.raw_key(&key.to_string());
        self.inner.queue_set(raw, bytes)
    }

    fn commit(&mut self) -> CacheResult<bool> {
        let queued = self.inner.queued() as u64;
        let committed = self.inner.commit()?;
        if committed {
            self.stats.record_puts(queued);
        }
        Ok(committed)
    }

    fn rollback(&mut self) -> CacheResult<()> {
        self.inner.rollback()
    }
}

impl<K, V> fmt::Debug for RemoteCacheTransaction<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCacheTransaction")
            .field("inner", &self.inner)
            .finish()
    }
}
