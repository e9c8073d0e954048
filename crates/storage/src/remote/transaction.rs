//! Optimistic transaction on the Redis backend.
//!
//! Lifecycle:
//! 1. `WATCH` every key on a dedicated connection
//! 2. writes are queued client-side in an atomic pipeline; a write to a key
//!    outside the watch set `WATCH`es it first
//! 3. `commit` sends `MULTI … EXEC`; a nil reply means a watched key changed
//! 4. `rollback` sends `UNWATCH`
//!
//! The connection goes back to the idle list only after a clean resolution.
//! A transaction dropped while open closes its connection, which also drops
//! the server-side WATCH.

use redis::Value;
use std::fmt;
use txcache_core::{CacheError, CacheResult, TransactionId, TransactionStatus};

use super::pool::PooledConnection;
use super::remote_error;

/// An open WATCH/MULTI/EXEC transaction pinned to one connection.
pub struct RemoteTransaction {
    id: TransactionId,
    cache: String,
    conn: PooledConnection,
    watched: Vec<Vec<u8>>,
    pipe: redis::Pipeline,
    queued: usize,
    ttl_secs: u64,
    status: TransactionStatus,
}

impl RemoteTransaction {
    pub(crate) fn watch(
        id: TransactionId,
        cache: &str,
        mut conn: PooledConnection,
        raw_keys: &[Vec<u8>],
        ttl_secs: u64,
    ) -> CacheResult<Self> {
        let mut watched: Vec<Vec<u8>> = Vec::with_capacity(raw_keys.len());
        for raw in raw_keys {
            if !watched.contains(raw) {
                watched.push(raw.clone());
            }
        }
        if !watched.is_empty() {
            let mut cmd = redis::cmd("WATCH");
            for raw in &watched {
                cmd.arg(raw);
            }
            if let Err(err) = cmd.query::<()>(&mut *conn) {
                conn.mark_broken();
                return Err(remote_error(err));
            }
        }
        tracing::debug!(cache, txn_id = %id, keys = raw_keys.len(), "remote transaction started");
        let mut pipe = redis::pipe();
        pipe.atomic();
        Ok(Self {
            id,
            cache: cache.to_string(),
            conn,
            watched,
            pipe,
            queued: 0,
            ttl_secs,
            status: TransactionStatus::Open,
        })
    }

    /// Transaction id (unique per cache handle)
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Current state
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Number of writes waiting for `commit`
    pub fn queued(&self) -> usize {
        self.queued
    }

    fn ensure_open(&self) -> CacheResult<()> {
        if self.status.is_open() {
            Ok(())
        } else {
            Err(CacheError::TransactionNotActive {
                id: self.id,
                state: self.status,
            })
        }
    }

    /// Number of distinct keys under `WATCH`
    pub fn watched(&self) -> usize {
        self.watched.len()
    }

    /// `WATCH` `raw_key` unless it already is. Legal at any point before
    /// `commit`, since `MULTI` is only sent there.
    fn watch_key(&mut self, raw_key: &[u8]) -> CacheResult<()> {
        if self.watched.iter().any(|watched| watched.as_slice() == raw_key) {
            return Ok(());
        }
        if let Err(err) = redis::cmd("WATCH").arg(raw_key).query::<()>(&mut *self.conn) {
            self.conn.mark_broken();
            return Err(remote_error(err));
        }
        tracing::debug!(cache = %self.cache, txn_id = %self.id, "watch set extended by buffered write");
        self.watched.push(raw_key.to_vec());
        Ok(())
    }

    /// Queue `SET raw bytes NX [EX ttl]`, watching `raw_key` first if it is
    /// outside the watch set. The write itself is sent at `commit`.
    pub fn queue_set(&mut self, raw_key: Vec<u8>, bytes: Vec<u8>) -> CacheResult<()> {
        self.ensure_open()?;
        self.watch_key(&raw_key)?;
        let cmd = self.pipe.cmd("SET").arg(raw_key).arg(bytes).arg("NX");
        if self.ttl_secs > 0 {
            cmd.arg("EX").arg(self.ttl_secs);
        }
        cmd.ignore();
        self.queued += 1;
        Ok(())
    }

    /// Execute the queued block atomically.
    ///
    /// Returns `Ok(false)` if any watched key changed since `WATCH`; nothing
    /// was applied in that case.
    pub fn commit(&mut self) -> CacheResult<bool> {
        self.ensure_open()?;
        let reply: redis::RedisResult<Option<Value>> = if self.queued == 0 {
            // No writes queued; EXEC still reports watched-key conflicts.
            redis::cmd("MULTI")
                .query::<()>(&mut *self.conn)
                .and_then(|()| redis::cmd("EXEC").query(&mut *self.conn))
        } else {
            self.pipe.query(&mut *self.conn)
        };
        match reply {
            Ok(Some(_)) => {
                self.status = TransactionStatus::Committed;
                tracing::debug!(cache = %self.cache, txn_id = %self.id, "remote transaction committed");
                Ok(true)
            }
            Ok(None) => {
                self.status = TransactionStatus::Aborted;
                tracing::debug!(cache = %self.cache, txn_id = %self.id, "remote transaction aborted by watched key change");
                Ok(false)
            }
            Err(err) => {
                self.status = TransactionStatus::Aborted;
                self.conn.mark_broken();
                tracing::error!(cache = %self.cache, txn_id = %self.id, error = %err, "remote commit failed");
                Err(remote_error(err))
            }
        }
    }

    /// Discard queued writes and release the watch.
    pub fn rollback(&mut self) -> CacheResult<()> {
        if !self.status.is_open() {
            return Ok(());
        }
        self.pipe.clear();
        self.queued = 0;
        self.status = TransactionStatus::RolledBack;
        if let Err(err) = redis::cmd("UNWATCH").query::<()>(&mut *self.conn) {
            self.conn.mark_broken();
            tracing::error!(cache = %self.cache, txn_id = %self.id, error = %err, "remote rollback failed");
            return Err(remote_error(err));
        }
        tracing::debug!(cache = %self.cache, txn_id = %self.id, "remote transaction rolled back");
        Ok(())
    }
}

impl Drop for RemoteTransaction {
    fn drop(&mut self) {
        if self.status.is_open() {
            self.status = TransactionStatus::RolledBack;
            self.conn.mark_broken();
            tracing::debug!(
                cache = %self.cache,
                txn_id = %self.id,
                "unresolved remote transaction dropped, closing connection"
            );
        }
    }
}

impl fmt::Debug for RemoteTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTransaction")
            .field("id", &self.id)
            .field("cache", &self.cache)
            .field("watched", &self.watched.len())
            .field("queued", &self.queued)
            .field("status", &self.status)
            .finish()
    }
}
