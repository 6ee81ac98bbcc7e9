//! Executor for a single Redis server behind a connection pool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::command::Command;
use crate::config::ClientConfig;
use crate::connection::pool::ConnectionPool;
use crate::error::{RedsetError, Result};
use crate::executor::{BatchFuture, Executor, ReplyFuture};
use crate::resp::types::RespValue;
use crate::runtime;

/// Sends every command to one server through a [`ConnectionPool`].
///
/// Each submission is spawned as its own task at call time, so a direct
/// call is on the wire before its future is awaited.
#[derive(Clone)]
pub struct StandaloneExecutor {
    pool: Arc<ConnectionPool>,
}

impl StandaloneExecutor {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new(config)),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn pool_idle_count(&self) -> usize {
        self.pool.idle_count()
    }

    pub fn pool_available(&self) -> usize {
        self.pool.available()
    }
}

impl Executor for StandaloneExecutor {
    fn execute(&self, command: Command) -> ReplyFuture {
        let pool = Arc::clone(&self.pool);
        spawned(async move { execute_on(&pool, command).await })
    }

    fn pipeline(&self, commands: Vec<Command>) -> BatchFuture {
        let pool = Arc::clone(&self.pool);
        spawned(async move { pipeline_on(&pool, commands).await })
    }
}

/// Spawn `task` now and return a future for its output.
fn spawned<T, F>(task: F) -> Pin<Box<dyn Future<Output = Result<T>> + Send>>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    match runtime::spawn(task) {
        Ok(handle) => Box::pin(async move {
            handle.await.map_err(|e| {
                RedsetError::Connection(std::io::Error::other(format!("command task failed: {e}")))
            })?
        }),
        Err(e) => Box::pin(async move { Err(e) }),
    }
}

async fn execute_on(pool: &ConnectionPool, command: Command) -> Result<RespValue> {
    let mut guard = pool.get().await?;
    let result = guard.conn().execute(&command).await;
    let reply = match result {
        Ok(reply) => reply,
        Err(e) => {
            guard.discard(&e);
            return Err(e);
        }
    };
    drop(guard);
    into_result(reply)
}

async fn pipeline_on(
    pool: &ConnectionPool,
    commands: Vec<Command>,
) -> Result<Vec<Result<RespValue>>> {
    let mut guard = pool.get().await?;
    let sent = guard.conn().send_pipeline(&commands).await;
    if let Err(e) = sent {
        guard.discard(&e);
        return Err(e);
    }

    let mut replies = Vec::with_capacity(commands.len());
    for _ in &commands {
        let read = guard.conn().read_response().await;
        match read {
            Ok(reply) => replies.push(into_result(reply)),
            Err(e) => {
                let remaining = commands.len() - replies.len() - 1;
                guard.discard(&e);
                replies.push(Err(e));
                replies.extend((0..remaining).map(|_| Err(aborted())));
                return Ok(replies);
            }
        }
    }
    Ok(replies)
}

/// Server error replies become `Err`.
fn into_result(reply: RespValue) -> Result<RespValue> {
    match reply {
        RespValue::Error(msg) | RespValue::BulkError(msg) => Err(RedsetError::redis(msg)),
        other => Ok(other),
    }
}

fn aborted() -> RedsetError {
    RedsetError::Connection(std::io::Error::new(
        std::io::ErrorKind::ConnectionAborted,
        "an earlier reply in the pipeline failed",
    ))
}

// ── Tests ──────────────────────────────────────────────────────────
