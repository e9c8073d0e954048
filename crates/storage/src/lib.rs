//! Backing stores for txcache
//!
//! This crate implements the two places a cache entry can live:
//! - [`LocalStore`]: in-process map bounded by weight and TTL (moka)
//! - [`RemoteStore`]: shared Redis store, including its native optimistic
//!   transaction ([`RemoteTransaction`]) and the server-side version CAS script
//!
//! Stores know nothing about transactions' conflict bookkeeping; the local
//! coordinator lives in `txcache-concurrency`, and the remote one is Redis
//! itself.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod local;
pub mod remote;

pub use local::LocalStore;
pub use remote::{
    frame_versioned, split_versioned, ConnectionPool, PooledConnection, RemoteStore,
    RemoteTransaction, VERSION_PREFIX_LEN,
};
