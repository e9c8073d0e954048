//! Local transaction coordinator
//!
//! Serializes every mutation of one cache namespace through a single mutex
//! and keeps a reverse index from key to the transactions watching it.
//!
//! ## Protocol
//!
//! ```text
//! begin(keys)          register id under every key
//! buffer(id, k, e)     remember (k, e) in the transaction only
//! write_with(keys, f)  poison watchers of keys, then run f (the store write)
//! commit(id, store)    failed? -> deregister, Aborted
//!                      else poison every other watcher of our keys,
//!                      put_if_absent each buffered entry, deregister
//! rollback(id)         deregister
//! ```
//!
//! Because poisoning and applying happen under the same lock, a failure is
//! always visible to any later commit.
//!
//! # Thread Safety
//!
//! The closure passed to [`TransactionCoordinator::write_with`] runs with the
//! lock held. It must be a brief in-memory store operation, never I/O.

use crate::metrics::{TransactionMetrics, TransactionMetricsSnapshot};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use txcache_core::{CacheKey, TransactionId};
use txcache_storage::LocalStore;

/// Result of [`TransactionCoordinator::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Buffered writes were offered to the store
    Committed {
        /// Entries actually inserted (a key filled meanwhile is left alone)
        applied: usize,
    },
    /// The transaction was poisoned; nothing was applied
    Aborted,
}

impl CommitOutcome {
    /// Check if the transaction committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed { .. })
    }
}

struct TransactionRecord<K, E> {
    keys: SmallVec<[K; 2]>,
    pending: Vec<(K, E)>,
    failed: bool,
}

struct CoordinatorState<K, E> {
    by_key: FxHashMap<K, FxHashSet<TransactionId>>,
    transactions: FxHashMap<TransactionId, TransactionRecord<K, E>>,
}

impl<K: CacheKey, E> CoordinatorState<K, E> {
    fn register(&mut self, key: K, id: TransactionId) {
        self.by_key.entry(key).or_default().insert(id);
    }

    /// Remove `id` from the table and from the index of every key it watched.
    fn deregister(&mut self, id: TransactionId) -> Option<TransactionRecord<K, E>> {
        let record = self.transactions.remove(&id)?;
        for key in &record.keys {
            if let Some(ids) = self.by_key.get_mut(key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.by_key.remove(key);
                }
            }
        }
        Some(record)
    }

    /// Mark every watcher of `key` except `except` failed. Returns how many
    /// transactions were newly poisoned.
    fn poison(&mut self, key: &K, except: Option<TransactionId>) -> u64 {
        let Some(ids) = self.by_key.get(key) else {
            return 0;
        };
        let mut poisoned = 0;
        for id in ids {
            if Some(*id) == except {
                continue;
            }
            if let Some(record) = self.transactions.get_mut(id) {
                if !record.failed {
                    record.failed = true;
                    poisoned += 1;
                }
            }
        }
        poisoned
    }
}

/// Optimistic transaction coordinator for one local cache namespace.
///
/// Generic over the stored entry `E` so plain (`Option<V>`) and versioned
/// (`VersionedEntry<V>`) caches share the same protocol.
pub struct TransactionCoordinator<K, E> {
    name: String,
    state: Mutex<CoordinatorState<K, E>>,
    next_txn_id: AtomicU64,
    metrics: TransactionMetrics,
}

impl<K, E> TransactionCoordinator<K, E>
where
    K: CacheKey,
    E: Clone + Send + Sync + 'static,
{
    /// Create a coordinator for cache `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(CoordinatorState {
                by_key: FxHashMap::default(),
                transactions: FxHashMap::default(),
            }),
            next_txn_id: AtomicU64::new(1),
            metrics: TransactionMetrics::default(),
        }
    }

    /// Cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a transaction watching `keys`.
    pub fn begin(&self, keys: &[K]) -> TransactionId {
        let id = TransactionId::new(self.next_txn_id.fetch_add(1, Ordering::Relaxed));
        let mut state = self.state.lock();
        let mut watched: SmallVec<[K; 2]> = SmallVec::with_capacity(keys.len());
        for key in keys {
            if !watched.contains(key) {
                watched.push(key.clone());
                state.register(key.clone(), id);
            }
        }
        state.transactions.insert(
            id,
            TransactionRecord {
                keys: watched,
                pending: Vec::new(),
                failed: false,
            },
        );
        drop(state);
        self.metrics.record_started();
        tracing::debug!(cache = %self.name, txn_id = %id, keys = keys.len(), "transaction started");
        id
    }

    /// Buffer `entry` for `key` in transaction `id`.
    ///
    /// A key outside the original watch set is watched from now on.
    /// Returns `false` if `id` is not an open transaction.
    pub fn buffer(&self, id: TransactionId, key: K, entry: E) -> bool {
        let mut state = self.state.lock();
        let newly_watched = match state.transactions.get_mut(&id) {
            None => return false,
            Some(record) => {
                let newly_watched = !record.keys.contains(&key);
                if newly_watched {
                    record.keys.push(key.clone());
                }
                record.pending.push((key.clone(), entry));
                newly_watched
            }
        };
        if newly_watched {
            state.register(key, id);
        }
        true
    }

    /// Poison every transaction watching `keys`, then run `apply` under the
    /// same lock.
    ///
    /// Used for direct puts and evictions, and for versioned CAS writes.
    pub fn write_with<R>(&self, keys: &[K], apply: impl FnOnce() -> R) -> R {
        let mut state = self.state.lock();
        let mut poisoned = 0;
        for key in keys {
            poisoned += state.poison(key, None);
        }
        if poisoned > 0 {
            self.metrics.record_poisoned(poisoned);
            tracing::debug!(cache = %self.name, poisoned, "direct write poisoned open transactions");
        }
        apply()
    }

    /// Resolve transaction `id`, applying its buffer to `store` unless it was
    /// poisoned. Always deregisters.
    pub fn commit(&self, id: TransactionId, store: &LocalStore<K, E>) -> CommitOutcome {
        let mut state = self.state.lock();
        let Some(record) = state.deregister(id) else {
            tracing::debug!(cache = %self.name, txn_id = %id, "commit of unknown transaction");
            return CommitOutcome::Aborted;
        };
        if record.failed {
            drop(state);
            self.metrics.record_aborted();
            tracing::debug!(cache = %self.name, txn_id = %id, "transaction aborted by conflicting write");
            return CommitOutcome::Aborted;
        }

        let mut poisoned = 0;
        for key in &record.keys {
            poisoned += state.poison(key, Some(id));
        }
        let mut applied = 0;
        for (key, entry) in record.pending {
            if store.put_if_absent(key, entry) {
                applied += 1;
            }
        }
        drop(state);

        self.metrics.record_committed();
        self.metrics.record_poisoned(poisoned);
        tracing::debug!(
            cache = %self.name,
            txn_id = %id,
            applied,
            poisoned,
            "transaction committed"
        );
        CommitOutcome::Committed { applied }
    }

    /// Deregister `id` without applying anything.
    ///
    /// Returns `false` if `id` was not open.
    pub fn rollback(&self, id: TransactionId) -> bool {
        let removed = self.state.lock().deregister(id).is_some();
        if removed {
            self.metrics.record_rolled_back();
            tracing::debug!(cache = %self.name, txn_id = %id, "transaction rolled back");
        }
        removed
    }

    /// Whether transaction `id` is open and has been poisoned.
    pub fn is_poisoned(&self, id: TransactionId) -> bool {
        self.state
            .lock()
            .transactions
            .get(&id)
            .map_or(false, |record| record.failed)
    }

    /// Number of open transactions watching `key`.
    pub fn watchers(&self, key: &K) -> usize {
        self.state.lock().by_key.get(key).map_or(0, FxHashSet::len)
    }

    /// Number of keys with at least one watcher.
    pub fn watched_key_count(&self) -> usize {
        self.state.lock().by_key.len()
    }

    /// Number of open transactions.
    pub fn active_count(&self) -> usize {
        self.state.lock().transactions.len()
    }

    /// Outcome counters.
    pub fn metrics(&self) -> TransactionMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<K, E> fmt::Debug for TransactionCoordinator<K, E>
where
    K: CacheKey,
    E: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("name", &self.name)
            .field("active", &self.active_count())
            .finish()
    }
}
