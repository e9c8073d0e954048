use redis::{Connection, RedisResult};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use txcache_core::{CacheResult, CacheSpecs, TransactionId};

use super::pool::ConnectionPool;
use super::script::VersionedSet;
use super::transaction::RemoteTransaction;
use super::{raw_key, remote_error, VERSION_PREFIX_LEN};

/// One cache namespace on the shared Redis store.
///
/// Works on encoded bytes only; codecs and the empty marker are applied by
/// the caller.
pub struct RemoteStore {
    name: String,
    pool: Arc<ConnectionPool>,
    ttl_secs: u64,
    evict_ttl_ms: u64,
    next_txn_id: AtomicU64,
}

impl RemoteStore {
    /// Create a namespace handle.
    ///
    /// # Arguments
    ///
    /// * `name` - Cache name, prefixed to every key
    /// * `pool` - Shared connection source
    /// * `specs` - Entry TTL (`time_to_live_minutes`, 0 for none)
    /// * `evict_ttl_ms` - TTL of the placeholder written by `evict_or_put`
    pub fn new(
        name: impl Into<String>,
        pool: Arc<ConnectionPool>,
        specs: &CacheSpecs,
        evict_ttl_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            pool,
            ttl_secs: specs.time_to_live().map_or(0, |ttl| ttl.as_secs()),
            evict_ttl_ms,
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Cache name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry TTL in seconds; 0 means entries never expire.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Store address of `key`.
    pub fn raw_key(&self, key: &str) -> Vec<u8> {
        raw_key(&self.name, key)
    }

    fn run<T>(&self, op: impl FnOnce(&mut Connection) -> RedisResult<T>) -> CacheResult<T> {
        let mut conn = self.pool.get()?;
        match op(&mut *conn) {
            Ok(value) => Ok(value),
            Err(err) => {
                conn.observe_error(&err);
                Err(remote_error(err))
            }
        }
    }

    fn set_cmd(&self, raw: &[u8], bytes: &[u8]) -> redis::Cmd {
        let mut cmd = redis::cmd("SET");
        cmd.arg(raw).arg(bytes);
        if self.ttl_secs > 0 {
            cmd.arg("EX").arg(self.ttl_secs);
        }
        cmd
    }

    /// Raw bytes stored under `key`.
    pub fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let raw = self.raw_key(key);
        self.run(|conn| redis::cmd("GET").arg(&raw).query(conn))
    }

    /// Payload of a versioned entry with the version prefix stripped.
    ///
    /// Returns `None` for an absent key and for a tombstone (a bare prefix).
    pub fn get_versioned(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let raw = self.raw_key(key);
        let payload: Vec<u8> = self.run(|conn| {
            redis::cmd("GETRANGE")
                .arg(&raw)
                .arg(VERSION_PREFIX_LEN)
                .arg(-1)
                .query(conn)
        })?;
        Ok(if payload.is_empty() { None } else { Some(payload) })
    }

    /// Unconditional `SET` with the entry TTL.
    pub fn set(&self, key: &str, bytes: &[u8]) -> CacheResult<()> {
        let raw = self.raw_key(key);
        let cmd = self.set_cmd(&raw, bytes);
        self.run(|conn| cmd.query(conn))
    }

    /// `SET NX` with the entry TTL. Returns `true` if written.
    pub fn set_nx(&self, key: &str, bytes: &[u8]) -> CacheResult<bool> {
        let raw = self.raw_key(key);
        let mut cmd = self.set_cmd(&raw, bytes);
        cmd.arg("NX");
        let reply: Option<String> = self.run(|conn| cmd.query(conn))?;
        Ok(reply.is_some())
    }

    /// Delete keys, returning how many existed.
    pub fn del(&self, keys: &[&str]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(self.raw_key(key));
        }
        self.run(|conn| cmd.query(conn))
    }

    /// Delete `key`; if nothing was deleted, write `bytes` with the short
    /// evict TTL so a read-through that missed before this call cannot
    /// repopulate a stale value after it.
    ///
    /// Returns `true` when the placeholder was written.
    pub fn evict_or_put(&self, key: &str, bytes: &[u8]) -> CacheResult<bool> {
        let raw = self.raw_key(key);
        let evict_ttl_ms = self.evict_ttl_ms;
        self.run(|conn| {
            let deleted: u64 = redis::cmd("DEL").arg(&raw).query(conn)?;
            if deleted > 0 {
                return Ok(false);
            }
            let reply: Option<String> = redis::cmd("SET")
                .arg(&raw)
                .arg(bytes)
                .arg("NX")
                .arg("PX")
                .arg(evict_ttl_ms)
                .query(conn)?;
            Ok(reply.is_some())
        })
    }

    /// Version-guarded write of `payload` (an empty payload is a tombstone).
    ///
    /// Returns `true` when applied, `false` when a newer version is stored.
    pub fn versioned_set(&self, key: &str, payload: &[u8], version: u64) -> CacheResult<bool> {
        let raw = self.raw_key(key);
        let request = VersionedSet {
            key: &raw,
            payload,
            version,
            ttl_secs: self.ttl_secs,
        };
        let applied = self.run(|conn| request.execute(conn))?;
        if !applied {
            tracing::debug!(cache = %self.name, key, version, "stale versioned write ignored");
        }
        Ok(applied)
    }

    /// Open a WATCH-based transaction over `keys`.
    pub fn begin_transaction(&self, keys: &[&str]) -> CacheResult<RemoteTransaction> {
        let id = TransactionId::new(self.next_txn_id.fetch_add(1, Ordering::Relaxed));
        let raw_keys: Vec<Vec<u8>> = keys.iter().map(|key| self.raw_key(key)).collect();
        let conn = self.pool.get()?;
        RemoteTransaction::watch(id, &self.name, conn, &raw_keys, self.ttl_secs)
    }
}

impl fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStore")
            .field("name", &self.name)
            .field("ttl_secs", &self.ttl_secs)
            .field("evict_ttl_ms", &self.evict_ttl_ms)
            .finish()
    }
}
