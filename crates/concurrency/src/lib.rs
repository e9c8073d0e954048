//! Concurrency layer for txcache
//!
//! This crate implements the local optimistic transaction coordinator:
//! - TransactionCoordinator: reverse index key → open transactions, one mutex
//!   per cache namespace
//! - Poisoning: direct writes and winning commits fail every other
//!   transaction watching the touched keys
//! - TransactionMetrics: committed/aborted/rolled-back counters
//!
//! Remote transactions need no coordinator; Redis' WATCH does the conflict
//! detection (see `txcache_storage::RemoteTransaction`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod metrics;

pub use coordinator::{CommitOutcome, TransactionCoordinator};
pub use metrics::{TransactionMetrics, TransactionMetricsSnapshot};
