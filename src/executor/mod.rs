//! The seam between command dispatch and the transport.

pub mod standalone;

pub use standalone::StandaloneExecutor;

use std::future::Future;
use std::pin::Pin;

use crate::command::Command;
use crate::error::Result;
use crate::resp::types::RespValue;

/// Reply to a single command.
pub type ReplyFuture = Pin<Box<dyn Future<Output = Result<RespValue>> + Send>>;

/// Replies to a batch, one entry per command in order.
///
/// The outer `Err` means nothing could be sent; inner errors are per position.
pub type BatchFuture = Pin<Box<dyn Future<Output = Result<Vec<Result<RespValue>>>> + Send>>;

/// Sends commands to a server.
///
/// Server error replies come back as `Err(RedsetError::Redis)`, from
/// `execute` directly and from `pipeline` at the failing position.
pub trait Executor: Send + Sync + 'static {
    /// Submit one command. Implementations should start the I/O before the
    /// future is first polled.
    fn execute(&self, command: Command) -> ReplyFuture;

    /// Submit a batch in one round trip.
    fn pipeline(&self, commands: Vec<Command>) -> BatchFuture;
}

impl<E: Executor + ?Sized> Executor for std::sync::Arc<E> {
    fn execute(&self, command: Command) -> ReplyFuture {
        (**self).execute(command)
    }

    fn pipeline(&self, commands: Vec<Command>) -> BatchFuture {
        (**self).pipeline(commands)
    }
}
