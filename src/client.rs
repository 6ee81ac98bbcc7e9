//! The set-command client and its two dispatch modes.
//!
//! In direct mode every call is handed to the executor immediately and
//! returns a future resolving to the normalized result. Between
//! [`SetClient::begin_pipeline`] and [`SetClient::flush_pipeline`] calls are
//! queued instead, and each returns its position in the batch.

use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;

use crate::command::{self, Command, ScanOptions};
use crate::config::ClientConfig;
use crate::error::{RedsetError, Result};
use crate::executor::{Executor, ReplyFuture, StandaloneExecutor};
use crate::pipeline::Pipeline;
use crate::reply::{Affected, FromSetReply, Normalizer, Popped, ScanPage, SetReply};

/// Outcome of issuing a command.
///
/// Awaiting a `Call` yields the normalized result in direct mode, and
/// `RedsetError::Queued(position)` for a call that went into a pipeline.
#[must_use = "a direct call's result is only observed by awaiting it"]
pub enum Call<T> {
    /// Queued at this position of the active pipeline.
    Queued(usize),
    /// Submitted to the executor.
    Pending(PendingCall<T>),
}

impl<T> Call<T> {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued(_))
    }

    /// Batch position, for a queued call.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Queued(i) => Some(*i),
            Self::Pending(_) => None,
        }
    }
}

impl<T: FromSetReply> IntoFuture for Call<T> {
    type Output = Result<T>;
    type IntoFuture = PendingCall<T>;

    fn into_future(self) -> PendingCall<T> {
        match self {
            Self::Queued(i) => PendingCall {
                state: State::Queued(i),
                _result: PhantomData,
            },
            Self::Pending(pending) => pending,
        }
    }
}

impl<T> std::fmt::Debug for Call<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued(i) => f.debug_tuple("Queued").field(i).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// A submitted command whose reply is normalized once it arrives.
///
/// Dropping it does not retract the command.
pub struct PendingCall<T> {
    state: State,
    _result: PhantomData<fn() -> T>,
}

enum State {
    Submitted {
        reply: ReplyFuture,
        normalizer: Normalizer,
    },
    Queued(usize),
    Done,
}

impl<T> PendingCall<T> {
    fn submitted(reply: ReplyFuture, normalizer: Normalizer) -> Self {
        Self {
            state: State::Submitted { reply, normalizer },
            _result: PhantomData,
        }
    }
}

impl<T: FromSetReply> Future for PendingCall<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<T>> {
        let this = &mut *self;
        match &mut this.state {
            State::Submitted { reply, normalizer } => {
                let normalizer = *normalizer;
                let raw = ready!(reply.as_mut().poll(cx));
                this.state = State::Done;
                // Executor errors skip the normalizer.
                Poll::Ready(raw.and_then(|raw| normalizer.apply(raw)).and_then(T::from_reply))
            }
            State::Queued(i) => {
                let i = *i;
                this.state = State::Done;
                Poll::Ready(Err(RedsetError::Queued(i)))
            }
            State::Done => Poll::Ready(Err(RedsetError::Protocol(
                "call polled after completion".into(),
            ))),
        }
    }
}

/// Client for the Redis set commands.
///
/// Each client owns its pipeline state; separate clients never share it.
pub struct SetClient<E: Executor = StandaloneExecutor> {
    executor: E,
    pipeline: Option<Pipeline>,
}

impl SetClient<StandaloneExecutor> {
    /// Client for a standalone server. Connections are opened lazily.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_executor(StandaloneExecutor::new(config))
    }

    pub fn from_url(url: &str) -> Result<Self> {
        ClientConfig::from_url(url).map(Self::new)
    }

    /// Configured from `REDIS_URL`, or the defaults.
    pub fn from_env() -> Result<Self> {
        ClientConfig::from_env().map(Self::new)
    }
}

impl<E: Executor> SetClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            pipeline: None,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    // ── Mode ───────────────────────────────────────────────────────

    pub fn is_pipeline_active(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Start queueing calls. A batch already open is kept.
    pub fn begin_pipeline(&mut self) {
        self.pipeline.get_or_insert_with(Pipeline::new);
    }

    /// Leave pipeline mode, dropping anything queued.
    pub fn discard_pipeline(&mut self) {
        if let Some(p) = self.pipeline.take() {
            tracing::debug!(size = p.len(), "pipeline discarded");
        }
    }

    /// Commands queued so far, `0` in direct mode.
    pub fn pipeline_len(&self) -> usize {
        self.pipeline.as_ref().map_or(0, Pipeline::len)
    }

    /// Send the queued batch and return to direct mode.
    ///
    /// Element `i` is the normalized result of the call that returned
    /// `Call::Queued(i)`. Direct mode is restored even if sending fails.
    pub async fn flush_pipeline(&mut self) -> Result<Vec<Result<SetReply>>> {
        match self.pipeline.take() {
            Some(p) => p.flush(&self.executor).await,
            None => Ok(Vec::new()),
        }
    }

    fn dispatch<T>(&mut self, command: Command, normalizer: Normalizer) -> Call<T> {
        match self.pipeline.as_mut() {
            Some(p) => {
                tracing::debug!(command = %command.name_lossy(), mode = "pipeline", "dispatch");
                Call::Queued(p.add(command, normalizer))
            }
            None => {
                tracing::debug!(command = %command.name_lossy(), mode = "direct", "dispatch");
                Call::Pending(PendingCall::submitted(self.executor.execute(command), normalizer))
            }
        }
    }

    /// Dispatch a member-list command whose reply counts affected members.
    fn dispatch_affected(&mut self, command: Command) -> Call<Affected> {
        let requested = command.len().saturating_sub(2);
        self.dispatch(command, Normalizer::Affected { requested })
    }

    // ── Set commands ───────────────────────────────────────────────

    /// `SADD`: [`Affected::All`] when every member was new.
    pub fn sadd(
        &mut self,
        key: impl AsRef<[u8]>,
        members: impl IntoIterator<Item = impl AsRef<[u8]>>,
    ) -> Call<Affected> {
        self.dispatch_affected(command::sadd(key, members))
    }

    pub fn scard(&mut self, key: impl AsRef<[u8]>) -> Call<i64> {
        self.dispatch(command::scard(key), Normalizer::Count)
    }

    /// Members of the first set not in any of the others.
    pub fn sdiff(&mut self, keys: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Call<Vec<Bytes>> {
        self.dispatch(command::sdiff(keys), Normalizer::Members)
    }

    /// Stores the difference at `destination`; resolves to its size.
    pub fn sdiffstore(
        &mut self,
        destination: impl AsRef<[u8]>,
        keys: impl IntoIterator<Item = impl AsRef<[u8]>>,
    ) -> Call<i64> {
        self.dispatch(command::sdiffstore(destination, keys), Normalizer::Count)
    }

    pub fn sinter(&mut self, keys: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Call<Vec<Bytes>> {
        self.dispatch(command::sinter(keys), Normalizer::Members)
    }

    pub fn sinterstore(
        &mut self,
        destination: impl AsRef<[u8]>,
        keys: impl IntoIterator<Item = impl AsRef<[u8]>>,
    ) -> Call<i64> {
        self.dispatch(command::sinterstore(destination, keys), Normalizer::Count)
    }

    pub fn sismember(&mut self, key: impl AsRef<[u8]>, member: impl AsRef<[u8]>) -> Call<bool> {
        self.dispatch(command::sismember(key, member), Normalizer::Flag)
    }

    pub fn smembers(&mut self, key: impl AsRef<[u8]>) -> Call<Vec<Bytes>> {
        self.dispatch(command::smembers(key), Normalizer::Members)
    }

    /// `true` if `member` was moved, `false` if it was not in `source`.
    pub fn smove(
        &mut self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
        member: impl AsRef<[u8]>,
    ) -> Call<bool> {
        self.dispatch(command::smove(source, destination, member), Normalizer::Flag)
    }

    /// Remove random members. Without `count` the result is
    /// [`Popped::One`]; with one it is [`Popped::Many`].
    pub fn spop(&mut self, key: impl AsRef<[u8]>, count: Option<u64>) -> Call<Popped> {
        let counted = count.is_some();
        self.dispatch(command::spop(key, count), Normalizer::Pop { counted })
    }

    /// Like [`spop`](Self::spop) without removing. A negative count may
    /// repeat members.
    pub fn srandmember(&mut self, key: impl AsRef<[u8]>, count: Option<i64>) -> Call<Popped> {
        let counted = count.is_some();
        self.dispatch(command::srandmember(key, count), Normalizer::Pop { counted })
    }

    /// `SREM`: [`Affected::All`] when every member was present.
    pub fn srem(
        &mut self,
        key: impl AsRef<[u8]>,
        members: impl IntoIterator<Item = impl AsRef<[u8]>>,
    ) -> Call<Affected> {
        self.dispatch_affected(command::srem(key, members))
    }

    /// One page of an incremental iteration. Start with cursor `0`; the
    /// iteration is complete when the returned cursor is `0` again.
    pub fn sscan(
        &mut self,
        key: impl AsRef<[u8]>,
        cursor: u64,
        options: &ScanOptions,
    ) -> Call<ScanPage> {
        self.dispatch(command::sscan(key, cursor, options), Normalizer::Scan)
    }

    pub fn sunion(&mut self, keys: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Call<Vec<Bytes>> {
        self.dispatch(command::sunion(keys), Normalizer::Members)
    }

    pub fn sunionstore(
        &mut self,
        destination: impl AsRef<[u8]>,
        keys: impl IntoIterator<Item = impl AsRef<[u8]>>,
    ) -> Call<i64> {
        self.dispatch(command::sunionstore(destination, keys), Normalizer::Count)
    }

    /// Drive `SSCAN` from cursor `0` until the server reports completion.
    ///
    /// Members added or removed meanwhile may be missed or repeated. Not
    /// available while a pipeline is active.
    pub async fn sscan_all(
        &mut self,
        key: impl AsRef<[u8]>,
        options: &ScanOptions,
    ) -> Result<Vec<Bytes>> {
        if self.is_pipeline_active() {
            return Err(RedsetError::PipelineActive);
        }
        let key = key.as_ref();
        let mut members = Vec::new();
        let mut cursor = 0;
        loop {
            let page = self.sscan(key, cursor, options).await?;
            members.extend(page.members);
            if page.cursor == 0 {
                return Ok(members);
            }
            cursor = page.cursor;
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
