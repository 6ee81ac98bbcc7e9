//! Async Redis set commands with direct and pipelined dispatch.
//!
//! ```no_run
//! # async fn demo() -> redset::Result<()> {
//! use redset::{Affected, SetClient};
//!
//! let mut client = SetClient::from_url("redis://127.0.0.1:6379")?;
//! assert_eq!(client.sadd("colors", ["red", "blue"]).await?, Affected::All);
//!
//! client.begin_pipeline();
//! let _ = client.scard("colors");
//! let _ = client.sismember("colors", "red");
//! let replies = client.flush_pipeline().await?;
//! assert_eq!(replies.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod reply;
pub mod resp;
pub mod runtime;

pub use client::{Call, PendingCall, SetClient};
pub use command::{Command, ScanOptions};
pub use config::ClientConfig;
pub use error::{RedisErrorKind, RedsetError, Result};
pub use executor::{BatchFuture, Executor, ReplyFuture, StandaloneExecutor};
pub use pipeline::Pipeline;
pub use reply::{Affected, FromSetReply, Normalizer, Popped, ScanPage, SetReply};
pub use resp::RespValue;
