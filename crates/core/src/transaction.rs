//! Transaction identity and lifecycle states.
//!
//! ```text
//! Open ──commit (no conflict)──▶ Committed
//!   │
//!   ├──commit (poisoned / EXEC nil)──▶ Aborted
//!   │
//!   └──rollback / drop──▶ RolledBack
//! ```
//!
//! Every terminal state releases the resources the transaction held: its
//! reverse-index entries locally, its pinned connection remotely.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque transaction identifier, unique per coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        TransactionId(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

/// Lifecycle state of a cache transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Accepting buffered writes
    Open,
    /// Buffered writes were applied
    Committed,
    /// A conflicting mutation touched a watched key; nothing was applied
    Aborted,
    /// Explicitly cancelled; nothing was applied
    RolledBack,
}

impl TransactionStatus {
    /// Whether the transaction still accepts writes.
    pub fn is_open(&self) -> bool {
        matches!(self, TransactionStatus::Open)
    }

    /// Whether the transaction reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Open => "open",
            TransactionStatus::Committed => "committed",
            TransactionStatus::Aborted => "aborted",
            TransactionStatus::RolledBack => "rolled back",
        };
        f.write_str(s)
    }
}
