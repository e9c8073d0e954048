//! Core types for txcache
//!
//! This crate defines the vocabulary shared by every layer:
//! - [`CacheKey`] / [`CacheValue`]: what can be cached
//! - [`CacheLookup`]: discriminated read result (present, explicit-empty, absent)
//! - [`VersionedEntry`] / [`HasVersion`]: version-stamped values for the CAS layer
//! - [`CacheCodec`]: injected serialization strategy for the remote backend
//! - [`CacheConfig`]: backend selection and per-cache specs
//! - [`CacheError`]: the single error type for all cache operations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod error;
pub mod stats;
pub mod transaction;
pub mod types;

pub use codec::{
    BincodeCodec, CacheCodec, CodecKind, JsonCodec, MessagePackCodec, TypedJsonCodec, NULL_MARKER,
};
pub use config::{
    BackendConfig, CacheConfig, CacheSpecs, RemoteSettings, MAX_TIME_TO_LIVE_MINUTES,
};
pub use error::{CacheError, CacheResult};
pub use stats::{CacheStats, StatsSnapshot};
pub use transaction::{TransactionId, TransactionStatus};
pub use types::{CacheKey, CacheLookup, CacheValue, HasVersion, VersionedEntry};
