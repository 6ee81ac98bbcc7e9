use bytes::Bytes;

/// A raw protocol reply.
///
/// Covers RESP2 plus the RESP3 scalar and set frames a server may send for
/// set commands.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// +OK\r\n
    SimpleString(String),
    /// -ERR message\r\n
    Error(String),
    /// :1000\r\n
    Integer(i64),
    /// $6\r\nfoobar\r\n
    BulkString(Bytes),
    /// *2\r\n…
    Array(Vec<RespValue>),
    /// $-1\r\n  or  *-1\r\n  (RESP2), or _\r\n (RESP3)
    Null,
    /// ,3.14\r\n (RESP3)
    Double(f64),
    /// #t\r\n or #f\r\n (RESP3)
    Boolean(bool),
    /// ~N\r\n (RESP3 set)
    Set(Vec<RespValue>),
    /// !21\r\nSYNTAX invalid syntax\r\n (RESP3 bulk error)
    BulkError(String),
}

// ── Convenience accessors ──────────────────────────────────────────

impl RespValue {
    /// Try to interpret this value as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::BulkString(b) => Some(b),
            Self::SimpleString(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Try to interpret this value as i64.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Take the elements of an array or RESP3 set.
    pub fn into_elements(self) -> Option<Vec<RespValue>> {
        match self {
            Self::Array(a) | Self::Set(a) => Some(a),
            _ => None,
        }
    }

    /// Take the payload of a string-like value without copying bulk data.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::BulkString(b) => Some(b),
            Self::SimpleString(s) => Some(Bytes::from(s)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true when this is a Redis error (simple or bulk).
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_) | Self::BulkError(_))
    }

    /// Returns the error message if this is an error value.
    pub fn as_error_msg(&self) -> Option<&str> {
        match self {
            Self::Error(msg) | Self::BulkError(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns the type name as a static string (useful for error messages).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SimpleString(_) => "simple_string",
            Self::Error(_) => "error",
            Self::Integer(_) => "integer",
            Self::BulkString(_) => "bulk_string",
            Self::Array(_) => "array",
            Self::Null => "null",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Set(_) => "set",
            Self::BulkError(_) => "bulk_error",
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────
