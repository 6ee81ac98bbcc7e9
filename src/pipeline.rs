//! Ordered batch of commands awaiting a single round trip.

use crate::command::Command;
use crate::error::{RedsetError, Result};
use crate::executor::Executor;
use crate::reply::{Normalizer, SetReply};
use crate::resp::types::RespValue;

/// Append-only list of `(command, normalizer)` pairs.
///
/// The Nth normalizer applies to the Nth reply. Flushing consumes the batch.
#[derive(Debug, Default)]
pub struct Pipeline {
    commands: Vec<Command>,
    normalizers: Vec<Normalizer>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command; returns its position in the batch.
    pub fn add(&mut self, command: Command, normalizer: Normalizer) -> usize {
        self.commands.push(command);
        self.normalizers.push(normalizer);
        self.commands.len() - 1
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_parts(self) -> (Vec<Command>, Vec<Normalizer>) {
        (self.commands, self.normalizers)
    }

    /// Send the batch and normalize every reply at its position.
    ///
    /// An `Err` here means the batch could not be sent at all; failures of
    /// individual commands appear inside the returned vector.
    pub async fn flush<E: Executor + ?Sized>(self, executor: &E) -> Result<Vec<Result<SetReply>>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let (commands, normalizers) = self.into_parts();
        tracing::debug!(size = commands.len(), "flushing pipeline");
        let replies = executor.pipeline(commands).await?;
        Ok(resolve(normalizers, replies))
    }
}

/// Zip replies with normalizers by index.
///
/// Positions without a reply fail with a protocol error; surplus replies are
/// ignored.
pub fn resolve(
    normalizers: Vec<Normalizer>,
    replies: Vec<Result<RespValue>>,
) -> Vec<Result<SetReply>> {
    let mut replies = replies.into_iter();
    normalizers
        .into_iter()
        .map(|normalizer| match replies.next() {
            Some(reply) => reply.and_then(|raw| normalizer.apply(raw)),
            None => Err(RedsetError::Protocol("missing reply in pipeline".into())),
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────
