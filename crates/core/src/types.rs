//! Key, value and lookup types.
//!
//! - [`CacheKey`]: blanket trait for anything hashable and printable
//! - [`CacheValue`]: serializable payload with a capacity weight
//! - [`CacheLookup`]: what a read found
//! - [`VersionedEntry`]: a payload (or tombstone) stamped with a source version

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Cache key bound.
///
/// Remote stores address entries by `cache name ‖ key.to_string()`, so the
/// `Display` form must be unique per logical key.
pub trait CacheKey: Hash + Eq + Clone + Debug + Display + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Hash + Eq + Clone + Debug + Display + Send + Sync + 'static {}

/// Cacheable payload.
///
/// `weight` feeds the local backend's capacity bound: scalars weigh 1,
/// collections weigh by element count.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Capacity units consumed by this value
    fn weight(&self) -> u32 {
        1
    }
}

macro_rules! scalar_cache_value {
    ($($t:ty),* $(,)?) => {
        $(impl CacheValue for $t {})*
    };
}

scalar_cache_value!(bool, i32, i64, u32, u64, f64, String);

fn count_weight(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX).max(1)
}

impl<T> CacheValue for Vec<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn weight(&self) -> u32 {
        count_weight(self.len())
    }
}

impl<T> CacheValue for HashSet<T>
where
    T: Clone + Eq + Hash + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn weight(&self) -> u32 {
        count_weight(self.len())
    }
}

impl<T> CacheValue for BTreeSet<T>
where
    T: Clone + Ord + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn weight(&self) -> u32 {
        count_weight(self.len())
    }
}

impl<K, V> CacheValue for HashMap<K, V>
where
    K: Clone + Eq + Hash + Serialize + DeserializeOwned + Send + Sync + 'static,
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn weight(&self) -> u32 {
        count_weight(self.len())
    }
}

impl<K, V> CacheValue for BTreeMap<K, V>
where
    K: Clone + Ord + Serialize + DeserializeOwned + Send + Sync + 'static,
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn weight(&self) -> u32 {
        count_weight(self.len())
    }
}

/// Result of a cache read.
///
/// `Empty` is explicit negative caching: the source was consulted and the
/// entity is known not to exist. `Absent` means nothing is cached at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<V> {
    /// A cached value
    Present(V),
    /// A cached "known to be absent" marker
    Empty,
    /// Nothing cached
    Absent,
}

impl<V> CacheLookup<V> {
    /// Build from a stored entry (`None` is the explicit-empty marker).
    pub fn from_entry(entry: Option<Option<V>>) -> Self {
        match entry {
            Some(Some(value)) => CacheLookup::Present(value),
            Some(None) => CacheLookup::Empty,
            None => CacheLookup::Absent,
        }
    }

    /// Whether anything (including the empty marker) is cached.
    pub fn is_cached(&self) -> bool {
        !matches!(self, CacheLookup::Absent)
    }

    /// Whether this is the explicit-empty marker.
    pub fn is_empty(&self) -> bool {
        matches!(self, CacheLookup::Empty)
    }

    /// Cached value, if any.
    pub fn value(&self) -> Option<&V> {
        match self {
            CacheLookup::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Consume into the cached value, if any.
    pub fn into_value(self) -> Option<V> {
        match self {
            CacheLookup::Present(v) => Some(v),
            _ => None,
        }
    }

    /// `Some(Some(v))` for a value, `Some(None)` for the empty marker,
    /// `None` when nothing is cached.
    pub fn into_cached(self) -> Option<Option<V>> {
        match self {
            CacheLookup::Present(v) => Some(Some(v)),
            CacheLookup::Empty => Some(None),
            CacheLookup::Absent => None,
        }
    }
}

/// Values that carry the source of truth's version counter.
pub trait HasVersion {
    /// Source version; `None` means the value is not versioned yet
    fn version(&self) -> Option<u64>;
}

/// A payload or tombstone stamped with the version that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedEntry<V> {
    /// Source version of this entry
    pub version: u64,
    /// Payload; `None` is a tombstone left by a versioned eviction
    pub value: Option<V>,
}

impl<V> VersionedEntry<V> {
    /// Live entry
    pub fn new(value: V, version: u64) -> Self {
        Self {
            version,
            value: Some(value),
        }
    }

    /// Tombstone at `version`
    pub fn tombstone(version: u64) -> Self {
        Self {
            version,
            value: None,
        }
    }

    /// Whether this entry records an eviction.
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// The CAS write rule: a write at `incoming` replaces what is stored iff
/// nothing is stored or `incoming >= stored`. Ties are accepted so that
/// redelivered writes are idempotent.
#[inline]
pub fn version_accepts(stored: Option<u64>, incoming: u64) -> bool {
    match stored {
        None => true,
        Some(current) => incoming >= current,
    }
}
