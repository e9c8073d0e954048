//! Cache engines for txcache
//!
//! This crate turns the backing stores into caches with optimistic
//! transactions:
//! - [`TransactionalCache`]: plain caches with explicit negative caching
//! - [`VersionedCache`]: version-stamped caches merged by compare-and-swap
//! - [`CacheTransaction`]: transaction handle, rolled back on drop
//!
//! Each trait has a local (moka + in-process coordinator) and a remote
//! (Redis WATCH/MULTI/EXEC and server-side script) implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod local;
pub mod remote;
pub mod traits;
pub mod transaction;
pub mod versioned;

pub use local::LocalTransactionalCache;
pub use remote::RemoteTransactionalCache;
pub use traits::{BoxedTransaction, CacheTransaction, TransactionalCache, VersionedCache};
pub use transaction::{LocalTransaction, RemoteCacheTransaction};
pub use versioned::{LocalVersionedCache, RemoteVersionedCache};
