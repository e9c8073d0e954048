//! Transaction outcome counters for one coordinator.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, updated under the coordinator lock.
#[derive(Debug, Default)]
pub struct TransactionMetrics {
    started: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
    rolled_back: AtomicU64,
    poisoned: AtomicU64,
}

/// Point-in-time copy of [`TransactionMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionMetricsSnapshot {
    /// Transactions begun
    pub total_started: u64,
    /// Transactions that committed
    pub total_committed: u64,
    /// Transactions that reached commit already poisoned
    pub total_aborted: u64,
    /// Transactions rolled back (explicitly or by drop)
    pub total_rolled_back: u64,
    /// Poison marks applied (a transaction can be poisoned more than once)
    pub total_poisoned: u64,
    /// Transactions still open
    pub active_count: u64,
    /// Commit success rate (0.0 - 1.0) over resolved commits
    pub commit_rate: f64,
}

impl TransactionMetrics {
    pub(crate) fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_committed(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_aborted(&self) {
        self.aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rolled_back(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_poisoned(&self, n: u64) {
        self.poisoned.fetch_add(n, Ordering::Relaxed);
    }

    /// Current values.
    pub fn snapshot(&self) -> TransactionMetricsSnapshot {
        let started = self.started.load(Ordering::Relaxed);
        let committed = self.committed.load(Ordering::Relaxed);
        let aborted = self.aborted.load(Ordering::Relaxed);
        let rolled_back = self.rolled_back.load(Ordering::Relaxed);
        let resolved_commits = committed + aborted;
        TransactionMetricsSnapshot {
            total_started: started,
            total_committed: committed,
            total_aborted: aborted,
            total_rolled_back: rolled_back,
            total_poisoned: self.poisoned.load(Ordering::Relaxed),
            active_count: started.saturating_sub(committed + aborted + rolled_back),
            commit_rate: if resolved_commits == 0 {
                0.0
            } else {
                committed as f64 / resolved_commits as f64
            },
        }
    }
}
