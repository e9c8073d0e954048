//! Consistency Test Suite
//!
//! End-to-end properties of the cache layer, run against every configured
//! backend.
//!
//! ## Backends
//!
//! - Local: always
//! - Remote: when `TXCACHE_TEST_REDIS_URL` points at a Redis server
//!
//! ## Running Tests
//!
//! ```bash
//! # Local only
//! cargo test --test consistency
//!
//! # Local and Redis
//! TXCACHE_TEST_REDIS_URL=redis://127.0.0.1/ cargo test --test consistency
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

use serde::{Deserialize, Serialize};
pub use txcache::prelude::*;
pub use txcache::TransactionStatus;

// Test modules
pub mod basic_ops;
pub mod concurrency;
pub mod config;
pub mod transactions;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

const REDIS_URL_VAR: &str = "TXCACHE_TEST_REDIS_URL";

static TRACING: Once = Once::new();
static NAME_SEQ: AtomicU64 = AtomicU64::new(0);

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Cache name unique to this process and call, so Redis keys never collide
/// between tests or runs.
pub fn unique_name(prefix: &str) -> String {
    format!(
        "{}:{}:{}:",
        prefix,
        std::process::id(),
        NAME_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Managers for every available backend.
pub fn managers() -> Vec<CacheManager> {
    init_tracing();
    let mut managers = vec![CacheManager::local()];
    if let Ok(url) = std::env::var(REDIS_URL_VAR) {
        let config = CacheConfig::remote(url)
            .with_default_specs(CacheSpecs::new(1000, 10).with_stats(true));
        managers.push(CacheManager::new(config).expect("Failed to configure Redis backend"));
    }
    managers
}

/// Direct connection to the test Redis server, when one is configured.
pub fn redis_connection() -> Option<redis::Connection> {
    let url = std::env::var(REDIS_URL_VAR).ok()?;
    let client = redis::Client::open(url).expect("Invalid Redis URL");
    Some(client.get_connection().expect("Failed to connect to Redis"))
}

/// Run `test` once per backend.
pub fn test_across_backends(test: impl Fn(&CacheManager)) {
    for manager in managers() {
        test(&manager);
    }
}

/// Fresh plain cache on `manager`.
pub fn fresh_cache<V: CacheValue>(manager: &CacheManager, prefix: &str) -> Cache<String, V> {
    manager
        .build_cache(&unique_name(prefix))
        .expect("Failed to build cache")
}

/// Fresh versioned cache on `manager`.
pub fn fresh_versioned(manager: &CacheManager, prefix: &str) -> CasCache<String, Attribute> {
    manager
        .build_versioned(&unique_name(prefix))
        .expect("Failed to build versioned cache")
}

pub fn key(s: &str) -> String {
    s.to_string()
}

/// Device record as a DAO would return it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub firmware: u32,
}

impl CacheValue for Device {}

pub fn device(id: &str, firmware: u32) -> Device {
    Device {
        id: id.to_string(),
        name: format!("Thermostat {}", id),
        firmware,
    }
}

/// Attribute stamped with the source's version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub value: String,
    pub version: Option<u64>,
}

impl CacheValue for Attribute {}

impl HasVersion for Attribute {
    fn version(&self) -> Option<u64> {
        self.version
    }
}

pub fn attr(value: &str, version: u64) -> Attribute {
    Attribute {
        value: value.to_string(),
        version: Some(version),
    }
}
