use std::io;

/// Structured Redis error kinds for programmatic matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedisErrorKind {
    /// Generic ERR
    Err,
    /// WRONGTYPE Operation against a key holding the wrong kind of value
    WrongType,
    /// LOADING Redis is loading the dataset in memory
    Loading,
    /// READONLY You can't write against a read only replica
    ReadOnly,
    /// NOSCRIPT No matching script
    NoScript,
    /// BUSY Redis is busy running a script
    Busy,
    /// Any other Redis error prefix
    Other(String),
}

impl RedisErrorKind {
    /// Classify a Redis error message by its leading word.
    pub fn from_error_msg(msg: &str) -> Self {
        let prefix = msg.split_whitespace().next().unwrap_or("UNKNOWN");
        match prefix {
            "ERR" => Self::Err,
            "WRONGTYPE" => Self::WrongType,
            "LOADING" => Self::Loading,
            "READONLY" => Self::ReadOnly,
            "NOSCRIPT" => Self::NoScript,
            "BUSY" => Self::Busy,
            other => Self::Other(other.to_string()),
        }
    }
}

/// All error variants for redset.
#[derive(Debug, thiserror::Error)]
pub enum RedsetError {
    /// TCP / IO level errors
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    /// RESP protocol parse errors, malformed URLs
    #[error("protocol error: {0}")]
    Protocol(String),

    /// RESP parser needs more data — not a real error, used as control flow.
    #[error("incomplete RESP message")]
    Incomplete,

    /// Redis returned an error reply
    #[error("redis error: {message}")]
    Redis {
        kind: RedisErrorKind,
        message: String,
    },

    /// The reply did not have the shape the command's normalizer expects.
    #[error("unexpected reply: expected {expected}, got {got}")]
    UnexpectedReply {
        expected: &'static str,
        got: &'static str,
    },

    /// Operation timed out
    #[error("timeout: {0}")]
    Timeout(String),

    /// The call was queued into the active pipeline; its result arrives
    /// with the flushed batch at this position.
    #[error("command queued in pipeline at position {0}")]
    Queued(usize),

    /// A direct-mode-only operation was attempted while a pipeline is open.
    #[error("operation not available while a pipeline is active")]
    PipelineActive,
}

impl RedsetError {
    /// Create a Redis error from a raw error message, auto-parsing the kind.
    pub fn redis(msg: impl Into<String>) -> Self {
        let message = msg.into();
        let kind = RedisErrorKind::from_error_msg(&message);
        Self::Redis { kind, message }
    }

    pub(crate) fn unexpected(expected: &'static str, got: &'static str) -> Self {
        Self::UnexpectedReply { expected, got }
    }

    /// The parsed kind, if this is a server error reply.
    pub fn redis_kind(&self) -> Option<&RedisErrorKind> {
        match self {
            Self::Redis { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Check if the server rejected the command because the key holds
    /// another type.
    pub fn is_wrong_type(&self) -> bool {
        matches!(self.redis_kind(), Some(RedisErrorKind::WrongType))
    }
}

pub type Result<T> = std::result::Result<T, RedsetError>;

// ── Tests ──────────────────────────────────────────────────────────
