//! Cache configuration.
//!
//! Exactly one backend is selected per deployment; every cache name then gets
//! its own [`CacheSpecs`], falling back to `default_specs`.
//!
//! ```toml
//! [backend]
//! type = "remote"
//! url = "redis://127.0.0.1/"
//! evict_ttl_ms = 60000
//!
//! [specs.device-by-id]
//! max_size = 1000
//! time_to_live_minutes = 10
//! stats_enabled = true
//! ```

use crate::codec::CodecKind;
use crate::error::{CacheError, CacheResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Longest accepted entry TTL, in minutes (100 years). The local backend
/// cannot represent much more.
pub const MAX_TIME_TO_LIVE_MINUTES: u64 = 100 * 365 * 24 * 60;

/// Per-cache sizing and expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSpecs {
    /// Maximum total weight held by the local backend (0 = unbounded)
    pub max_size: u64,
    /// Entry lifetime from insertion, in minutes (0 = never expires)
    pub time_to_live_minutes: u64,
    /// Record hit/miss counters
    pub stats_enabled: bool,
}

impl Default for CacheSpecs {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            time_to_live_minutes: 60,
            stats_enabled: false,
        }
    }
}

impl CacheSpecs {
    /// Specs with the given capacity and TTL, stats off.
    pub fn new(max_size: u64, time_to_live_minutes: u64) -> Self {
        Self {
            max_size,
            time_to_live_minutes,
            stats_enabled: false,
        }
    }

    /// Enable or disable stats.
    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats_enabled = enabled;
        self
    }

    /// TTL as a duration, `None` when entries never expire.
    ///
    /// Values above [`MAX_TIME_TO_LIVE_MINUTES`] are clamped to it;
    /// [`CacheConfig::validate`] rejects them outright.
    pub fn time_to_live(&self) -> Option<Duration> {
        match self.time_to_live_minutes {
            0 => None,
            minutes => {
                let secs = minutes.min(MAX_TIME_TO_LIVE_MINUTES).saturating_mul(60);
                Some(Duration::from_secs(secs))
            }
        }
    }

    /// Capacity bound, `None` when unbounded.
    pub fn capacity(&self) -> Option<u64> {
        match self.max_size {
            0 => None,
            n => Some(n),
        }
    }
}

/// Connection settings for the shared Redis backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Connection URL (`redis://`, `rediss://` or `redis+unix://`)
    pub url: String,
    /// TTL of the placeholder written by `evict_or_put` when the key was
    /// already absent. Tune to the longest expected source read.
    pub evict_ttl_ms: u64,
    /// Idle connections kept for reuse
    pub max_idle_connections: usize,
    /// Payload codec
    pub codec: CodecKind,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/".to_string(),
            evict_ttl_ms: 60_000,
            max_idle_connections: 8,
            codec: CodecKind::default(),
        }
    }
}

/// Backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// In-process bounded map
    Local,
    /// Shared Redis store
    Remote(RemoteSettings),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Selected backend
    pub backend: BackendConfig,
    /// Specs for caches without an explicit entry
    pub default_specs: CacheSpecs,
    /// Specs by cache name
    pub specs: HashMap<String, CacheSpecs>,
}

impl CacheConfig {
    /// Local backend, default specs.
    pub fn local() -> Self {
        Self::default()
    }

    /// Remote backend at `url`, default settings otherwise.
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig::Remote(RemoteSettings {
                url: url.into(),
                ..RemoteSettings::default()
            }),
            ..Self::default()
        }
    }

    /// Add or replace specs for one cache.
    pub fn with_specs(mut self, cache_name: impl Into<String>, specs: CacheSpecs) -> Self {
        self.specs.insert(cache_name.into(), specs);
        self
    }

    /// Replace the fallback specs.
    pub fn with_default_specs(mut self, specs: CacheSpecs) -> Self {
        self.default_specs = specs;
        self
    }

    /// Specs for `cache_name`.
    pub fn specs_for(&self, cache_name: &str) -> &CacheSpecs {
        self.specs.get(cache_name).unwrap_or(&self.default_specs)
    }

    /// Parse and validate TOML.
    pub fn from_toml_str(input: &str) -> CacheResult<Self> {
        let config: CacheConfig =
            toml::from_str(input).map_err(|e| CacheError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> CacheResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check settings that would otherwise fail at first use.
    pub fn validate(&self) -> CacheResult<()> {
        if let BackendConfig::Remote(remote) = &self.backend {
            if remote.url.trim().is_empty() {
                return Err(CacheError::Config("remote backend url is empty".to_string()));
            }
            if remote.evict_ttl_ms == 0 {
                return Err(CacheError::Config(
                    "evict_ttl_ms must be positive, a zero TTL placeholder never closes the race"
                        .to_string(),
                ));
            }
        }
        check_ttl("default_specs", &self.default_specs)?;
        for (name, specs) in &self.specs {
            if name.is_empty() {
                return Err(CacheError::Config("cache name must not be empty".to_string()));
            }
            check_ttl(name, specs)?;
        }
        Ok(())
    }
}

fn check_ttl(cache_name: &str, specs: &CacheSpecs) -> CacheResult<()> {
    if specs.time_to_live_minutes > MAX_TIME_TO_LIVE_MINUTES {
        return Err(CacheError::Config(format!(
            "{}: time_to_live_minutes {} exceeds the maximum of {}",
            cache_name, specs.time_to_live_minutes, MAX_TIME_TO_LIVE_MINUTES
        )));
    }
    Ok(())
}
