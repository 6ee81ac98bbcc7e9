//! Async TCP connection to a Redis server.
//!
//! Wraps a `tokio::net::TcpStream` with an integrated read buffer and
//! RESP parser for streaming request/response I/O.

use crate::command::Command;
use crate::error::{RedsetError, Result};
use crate::resp::parser::parse;
use crate::resp::types::RespValue;
use crate::resp::writer::encode_pipeline;

use bytes::BytesMut;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Initial read buffer capacity (64 KB).
const DEFAULT_BUF_CAPACITY: usize = 64 * 1024;

/// Default maximum read buffer size (512 MB).
pub const DEFAULT_MAX_BUF_SIZE: usize = 512 * 1024 * 1024;

/// A single async connection to a Redis server.
pub struct RedisConnection {
    stream: TcpStream,
    /// Bytes read from the socket but not yet consumed by the parser.
    buf: BytesMut,
    max_buf_size: usize,
    /// `None` waits forever for a reply.
    read_timeout: Option<Duration>,
    /// Timestamp of last successful I/O (for idle checks).
    pub last_used: Instant,
}

impl RedisConnection {
    /// Connect to `addr` (e.g. "127.0.0.1:6379").
    pub async fn connect_with_max_buf(addr: &str, max_buf_size: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true).ok();
        tracing::trace!(addr, "connected");
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            max_buf_size,
            read_timeout: None,
            last_used: Instant::now(),
        })
    }

    /// Connect, giving up after `timeout`.
    pub async fn connect_timeout(
        addr: &str,
        timeout: Duration,
        max_buf_size: usize,
    ) -> Result<Self> {
        match tokio::time::timeout(timeout, Self::connect_with_max_buf(addr, max_buf_size)).await {
            Ok(result) => result,
            Err(_) => Err(RedsetError::Timeout(format!(
                "connection to {addr} timed out after {timeout:?}"
            ))),
        }
    }

    /// Bound how long [`read_response`](Self::read_response) waits; `0` disables.
    pub fn set_read_timeout(&mut self, millis: u64) {
        self.read_timeout = (millis > 0).then(|| Duration::from_millis(millis));
    }

    async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.stream.write_all(data).await?;
        self.last_used = Instant::now();
        Ok(())
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        self.send_raw(&command.encode()).await
    }

    /// Write a batch of commands in a single write.
    pub async fn send_pipeline(&mut self, commands: &[Command]) -> Result<()> {
        self.send_raw(&encode_pipeline(commands)).await
    }

    /// Read and parse one complete RESP value, honouring the read timeout.
    pub async fn read_response(&mut self) -> Result<RespValue> {
        match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.read_frame()).await {
                Ok(result) => result,
                Err(_) => Err(RedsetError::Timeout(format!(
                    "no reply within {limit:?}"
                ))),
            },
            None => self.read_frame().await,
        }
    }

    /// Freezes the read buffer before parsing so bulk strings are
    /// zero-copy slices of it.
    async fn read_frame(&mut self) -> Result<RespValue> {
        loop {
            if !self.buf.is_empty() {
                let snapshot = self.buf.split().freeze();
                match parse(&snapshot) {
                    Ok((value, consumed)) => {
                        if consumed < snapshot.len() {
                            self.buf.extend_from_slice(&snapshot[consumed..]);
                        }
                        self.last_used = Instant::now();
                        tracing::trace!(kind = value.type_name(), consumed, "reply read");
                        return Ok(value);
                    }
                    Err(RedsetError::Incomplete) => {
                        self.buf.extend_from_slice(&snapshot);
                    }
                    Err(e) => {
                        self.buf.extend_from_slice(&snapshot);
                        return Err(e);
                    }
                }
            }

            self.reserve_read_space()?;
            let n = self.stream.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Err(RedsetError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                )));
            }
        }
    }

    fn reserve_read_space(&mut self) -> Result<()> {
        if self.buf.capacity() - self.buf.len() >= 4096 {
            return Ok(());
        }
        let new_cap = (self.buf.capacity() * 2).max(DEFAULT_BUF_CAPACITY);
        if new_cap <= self.max_buf_size {
            self.buf.reserve(new_cap - self.buf.capacity());
        } else if self.buf.capacity() < self.max_buf_size {
            self.buf.reserve(self.max_buf_size - self.buf.capacity());
        } else {
            return Err(RedsetError::Protocol(format!(
                "RESP message too large: buffer would exceed {} bytes",
                self.max_buf_size
            )));
        }
        Ok(())
    }

    /// Send a command and read its reply.
    pub async fn execute(&mut self, command: &Command) -> Result<RespValue> {
        self.send(command).await?;
        self.read_response().await
    }

    /// Run a handshake command that must answer `+OK`.
    async fn expect_ok(&mut self, command: Command) -> Result<()> {
        let name = command.name_lossy().into_owned();
        match self.execute(&command).await? {
            RespValue::SimpleString(ref s) if s == "OK" => Ok(()),
            RespValue::Error(msg) | RespValue::BulkError(msg) => Err(RedsetError::redis(msg)),
            other => Err(RedsetError::Protocol(format!(
                "unexpected {name} response: {}",
                other.type_name()
            ))),
        }
    }

    pub async fn auth(&mut self, username: Option<&str>, password: &str) -> Result<()> {
        let mut command = Command::new("AUTH");
        if let Some(user) = username {
            command = command.arg(user);
        }
        self.expect_ok(command.arg(password)).await
    }

    /// Select a database index; `0` is the server default and sends nothing.
    pub async fn select_db(&mut self, db: u16) -> Result<()> {
        if db == 0 {
            return Ok(());
        }
        self.expect_ok(Command::new("SELECT").arg_int(db)).await
    }

    /// Authenticate and select the database, as configured.
    pub async fn init(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
        db: u16,
    ) -> Result<()> {
        if let Some(pass) = password {
            self.auth(username, pass).await?;
        }
        self.select_db(db).await
    }
}

// ── Tests ──────────────────────────────────────────────────────────
