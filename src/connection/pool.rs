//! Async connection pool for Redis connections.
//!
//! A semaphore bounds how many connections are checked out; idle ones wait
//! in a deque behind a `parking_lot::Mutex` (held very briefly) so the guard
//! can hand its connection back from `Drop` without awaiting.

use crate::config::ClientConfig;
use crate::connection::tcp::RedisConnection;
use crate::error::{RedsetError, Result};

use parking_lot::Mutex as SyncMutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

/// An async connection pool for one server.
pub struct ConnectionPool {
    idle: SyncMutex<VecDeque<RedisConnection>>,
    semaphore: Semaphore,
    config: ClientConfig,
    max_size: usize,
    idle_timeout: Duration,
}

impl ConnectionPool {
    pub fn new(config: ClientConfig) -> Self {
        let max_size = config.pool_size.max(1);
        let idle_timeout = Duration::from_millis(config.idle_timeout_ms);
        Self {
            idle: SyncMutex::new(VecDeque::with_capacity(max_size)),
            semaphore: Semaphore::new(max_size),
            config,
            max_size,
            idle_timeout,
        }
    }

    /// Check out a connection, reusing an idle one when possible.
    ///
    /// The returned [`PoolGuard`] gives the connection back when dropped.
    pub async fn get(&self) -> Result<PoolGuard<'_>> {
        let permit = self.semaphore.acquire().await.map_err(|_| {
            RedsetError::Connection(std::io::Error::other("pool semaphore closed"))
        })?;

        let reused = {
            let mut idle = self.idle.lock();
            self.take_healthy_connection(&mut idle)
        };

        let conn = match reused {
            Some(c) => c,
            None => self.create_connection().await?,
        };

        Ok(PoolGuard {
            conn: Some(conn),
            pool: self,
            _permit: permit,
        })
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Permits left, roughly `max_size - checked_out`.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn create_connection(&self) -> Result<RedisConnection> {
        // Refuse rather than silently send credentials in plaintext.
        if self.config.tls {
            return Err(RedsetError::Protocol(
                "TLS connections (rediss://) are not supported; use redis://".into(),
            ));
        }

        let addr = self.config.addr();
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let mut conn =
            RedisConnection::connect_timeout(&addr, timeout, self.config.max_buffer_size).await?;
        conn.set_read_timeout(self.config.read_timeout_ms);

        conn.init(
            self.config.username.as_deref(),
            self.config.password.as_deref(),
            self.config.db,
        )
        .await?;

        tracing::trace!(addr = %addr, db = self.config.db, "pool connection ready");
        Ok(conn)
    }

    /// LIFO, so the warmest connection is reused first.
    fn take_healthy_connection(
        &self,
        idle: &mut VecDeque<RedisConnection>,
    ) -> Option<RedisConnection> {
        while let Some(conn) = idle.pop_back() {
            if conn.last_used.elapsed() <= self.idle_timeout {
                return Some(conn);
            }
        }
        None
    }

    fn return_connection(&self, conn: RedisConnection) {
        if conn.last_used.elapsed() > self.idle_timeout {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.max_size {
            idle.push_back(conn);
        }
    }
}

/// RAII guard that returns the connection to the pool on drop.
pub struct PoolGuard<'a> {
    conn: Option<RedisConnection>,
    pool: &'a ConnectionPool,
    _permit: SemaphorePermit<'a>,
}

impl PoolGuard<'_> {
    pub fn conn(&mut self) -> &mut RedisConnection {
        self.conn.as_mut().expect("connection already discarded")
    }

    /// Drop the connection instead of returning it; used once a read or
    /// write failed and the stream position is unknown.
    pub fn discard(mut self, reason: &RedsetError) {
        if self.conn.take().is_some() {
            tracing::warn!(error = %reason, "discarding broken connection");
        }
    }
}

impl Drop for PoolGuard<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.return_connection(conn);
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
