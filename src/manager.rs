//! Explicitly constructed cache graph.
//!
//! A [`CacheManager`] holds the backend selection and per-name specs, and
//! builds one cache (with its own coordinator) per name. There is no global
//! registry: consumers receive the caches they need at startup.

use crate::cache::Cache;
use crate::cas::CasCache;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use txcache_core::{
    BackendConfig, CacheConfig, CacheError, CacheKey, CacheResult, CacheSpecs, CacheValue,
    HasVersion, RemoteSettings,
};
use txcache_engine::{
    LocalTransactionalCache, LocalVersionedCache, RemoteTransactionalCache, RemoteVersionedCache,
};
use txcache_storage::{ConnectionPool, RemoteStore};

/// Builds caches for one backend.
///
/// # Example
///
/// ```ignore
/// use txcache::prelude::*;
///
/// let manager = CacheManager::new(
///     CacheConfig::local().with_specs("device-by-id", CacheSpecs::new(1000, 10)),
/// )?;
/// let devices: Cache<String, Device> = manager.build_cache("device-by-id")?;
/// ```
pub struct CacheManager {
    config: CacheConfig,
    pool: Option<Arc<ConnectionPool>>,
    built: Mutex<FxHashSet<String>>,
}

impl CacheManager {
    /// Validate `config` and prepare the backend.
    ///
    /// For the remote backend this parses the URL but opens no connection.
    pub fn new(config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        let pool = match &config.backend {
            BackendConfig::Local => None,
            BackendConfig::Remote(settings) => Some(ConnectionPool::open(settings)?),
        };
        tracing::debug!(remote = pool.is_some(), "cache manager created");
        Ok(Self {
            config,
            pool,
            built: Mutex::new(FxHashSet::default()),
        })
    }

    /// Manager for the local backend with default specs.
    pub fn local() -> Self {
        Self {
            config: CacheConfig::local(),
            pool: None,
            built: Mutex::new(FxHashSet::default()),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> CacheResult<Self> {
        Self::new(CacheConfig::from_file(path)?)
    }

    /// Configuration in effect
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Whether caches are built on the remote backend
    pub fn is_remote(&self) -> bool {
        self.pool.is_some()
    }

    /// Idle remote connections (0 for the local backend)
    pub fn idle_connections(&self) -> usize {
        self.pool.as_ref().map_or(0, |pool| pool.idle_count())
    }

    fn claim(&self, name: &str) -> CacheResult<&CacheSpecs> {
        if name.is_empty() {
            return Err(CacheError::Config("cache name must not be empty".to_string()));
        }
        if !self.built.lock().insert(name.to_string()) {
            return Err(CacheError::DuplicateCache(name.to_string()));
        }
        Ok(self.config.specs_for(name))
    }

    fn remote_store(
        &self,
        name: &str,
        specs: &CacheSpecs,
    ) -> Option<(RemoteStore, &RemoteSettings)> {
        let BackendConfig::Remote(settings) = &self.config.backend else {
            return None;
        };
        let pool = self.pool.as_ref()?;
        Some((
            RemoteStore::new(name, Arc::clone(pool), specs, settings.evict_ttl_ms),
            settings,
        ))
    }

    /// Build the plain cache named `name`.
    ///
    /// Fails with [`CacheError::DuplicateCache`] if `name` was built before.
    pub fn build_cache<K, V>(&self, name: &str) -> CacheResult<Cache<K, V>>
    where
        K: CacheKey,
        V: CacheValue,
    {
        let specs = self.claim(name)?.clone();
        let cache = match self.remote_store(name, &specs) {
            Some((store, settings)) => Cache::new(RemoteTransactionalCache::new(
                store,
                settings.codec.build::<V>(),
                specs.stats_enabled,
            )),
            None => Cache::new(LocalTransactionalCache::new(name, &specs)),
        };
        tracing::debug!(cache = name, remote = self.is_remote(), "cache built");
        Ok(cache)
    }

    /// Build the versioned cache named `name`.
    pub fn build_versioned<K, V>(&self, name: &str) -> CacheResult<CasCache<K, V>>
    where
        K: CacheKey,
        V: CacheValue + HasVersion,
    {
        let specs = self.claim(name)?.clone();
        let cache = match self.remote_store(name, &specs) {
            Some((store, settings)) => CasCache::new(RemoteVersionedCache::new(
                store,
                settings.codec.build::<V>(),
                specs.stats_enabled,
            )),
            None => CasCache::new(LocalVersionedCache::new(name, &specs)),
        };
        tracing::debug!(cache = name, remote = self.is_remote(), "versioned cache built");
        Ok(cache)
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("remote", &self.is_remote())
            .field("built", &self.built.lock().len())
            .finish()
    }
}
