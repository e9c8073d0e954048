//! Idle-connection list for the Redis backend.
//!
//! Not a general-purpose pool: it only keeps up to `max_idle` healthy
//! connections around for reuse and opens new ones on demand. A connection
//! whose protocol state is unknown (I/O failure, dropped mid-transaction) is
//! marked broken and closed instead of being returned.

use parking_lot::Mutex;
use redis::{Client, Connection, ConnectionLike};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use txcache_core::{CacheResult, RemoteSettings};

use super::remote_error;

/// Shared source of Redis connections.
pub struct ConnectionPool {
    client: Client,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
}

impl ConnectionPool {
    /// Create a pool for the configured URL. No connection is opened yet.
    pub fn open(settings: &RemoteSettings) -> CacheResult<Arc<Self>> {
        let client = Client::open(settings.url.as_str()).map_err(remote_error)?;
        Ok(Arc::new(Self {
            client,
            idle: Mutex::new(Vec::with_capacity(settings.max_idle_connections)),
            max_idle: settings.max_idle_connections,
        }))
    }

    /// Take an idle connection or open a new one.
    pub fn get(self: &Arc<Self>) -> CacheResult<PooledConnection> {
        let reused = self.idle.lock().pop();
        let conn = match reused {
            Some(conn) => conn,
            None => self.client.get_connection().map_err(remote_error)?,
        };
        Ok(PooledConnection {
            conn: Some(conn),
            pool: Arc::clone(self),
            broken: false,
        })
    }

    /// Number of connections waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn release(&self, conn: Connection) {
        if !conn.is_open() {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(conn);
        }
    }
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("idle", &self.idle_count())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// A connection checked out of the pool; returned on drop unless broken.
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<ConnectionPool>,
    broken: bool,
}

impl PooledConnection {
    /// Close this connection on drop instead of returning it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Mark broken when `err` leaves the connection in an unknown state.
    pub fn observe_error(&mut self, err: &redis::RedisError) {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout() {
            self.broken = true;
        }
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
            .as_ref()
            .unwrap_or_else(|| unreachable!("connection is present until drop"))
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn
            .as_mut()
            .unwrap_or_else(|| unreachable!("connection is present until drop"))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if self.broken {
                tracing::debug!("closing broken redis connection");
            } else {
                self.pool.release(conn);
            }
        }
    }
}
