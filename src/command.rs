//! Command vectors for the set family.
//!
//! Every builder is a pure function from typed arguments to a [`Command`]
//! whose tokens are in the exact order the server expects. Variadic
//! builders forward whatever they are given, including nothing: arity
//! errors are the server's call.
//!
//! Keys and members accept anything that is `AsRef<[u8]>`, so `&str`,
//! `String`, `&[u8]`, `Vec<u8>` and `Bytes` all work.

use bytes::Bytes;
use itoa::Buffer;

use crate::resp::writer::encode_command;

/// One protocol command: the name followed by its argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    /// Start a command vector with its name.
    pub fn new(name: &'static str) -> Self {
        Self {
            args: vec![Bytes::from_static(name.as_bytes())],
        }
    }

    /// Append one binary-safe token.
    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(Bytes::copy_from_slice(arg.as_ref()));
        self
    }

    /// Append every token yielded by `args`, in order.
    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Self {
        self.args
            .extend(args.into_iter().map(|a| Bytes::copy_from_slice(a.as_ref())));
        self
    }

    /// Append an integer in base-ten ASCII.
    pub fn arg_int<N: itoa::Integer>(self, n: N) -> Self {
        let mut buf = Buffer::new();
        let digits = buf.format(n);
        self.arg(digits)
    }

    /// The command name token.
    pub fn name(&self) -> &[u8] {
        &self.args[0]
    }

    /// The name as text, for logs.
    pub fn name_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.name())
    }

    /// All tokens, name first.
    pub fn args_slice(&self) -> &[Bytes] {
        &self.args
    }

    /// Number of tokens, name included.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// A command vector always holds at least its name.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_args(self) -> Vec<Bytes> {
        self.args
    }

    /// RESP wire bytes for this command.
    pub fn encode(&self) -> Vec<u8> {
        encode_command(&self.args)
    }
}

/// Optional `MATCH` / `COUNT` arguments for `SSCAN`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pattern: Option<Bytes>,
    count: Option<u64>,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only return members matching this glob-style pattern.
    /// An empty pattern is the same as no pattern.
    pub fn pattern(mut self, pattern: impl AsRef<[u8]>) -> Self {
        let pattern = pattern.as_ref();
        self.pattern = (!pattern.is_empty()).then(|| Bytes::copy_from_slice(pattern));
        self
    }

    /// Hint for how much work the server does per call.
    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn pattern_bytes(&self) -> Option<&Bytes> {
        self.pattern.as_ref()
    }

    pub fn count_hint(&self) -> Option<u64> {
        self.count
    }
}

// ── Builders ───────────────────────────────────────────────────────

/// `SADD key member [member …]`
pub fn sadd(key: impl AsRef<[u8]>, members: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Command {
    Command::new("SADD").arg(key).args(members)
}

/// `SCARD key`
pub fn scard(key: impl AsRef<[u8]>) -> Command {
    Command::new("SCARD").arg(key)
}

/// `SDIFF key [key …]`
pub fn sdiff(keys: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Command {
    Command::new("SDIFF").args(keys)
}

/// `SDIFFSTORE destination key [key …]`
pub fn sdiffstore(
    destination: impl AsRef<[u8]>,
    keys: impl IntoIterator<Item = impl AsRef<[u8]>>,
) -> Command {
    Command::new("SDIFFSTORE").arg(destination).args(keys)
}

/// `SINTER key [key …]`
pub fn sinter(keys: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Command {
    Command::new("SINTER").args(keys)
}

/// `SINTERSTORE destination key [key …]`
pub fn sinterstore(
    destination: impl AsRef<[u8]>,
    keys: impl IntoIterator<Item = impl AsRef<[u8]>>,
) -> Command {
    Command::new("SINTERSTORE").arg(destination).args(keys)
}

/// `SISMEMBER key member`
pub fn sismember(key: impl AsRef<[u8]>, member: impl AsRef<[u8]>) -> Command {
    Command::new("SISMEMBER").arg(key).arg(member)
}

/// `SMEMBERS key`
pub fn smembers(key: impl AsRef<[u8]>) -> Command {
    Command::new("SMEMBERS").arg(key)
}

/// `SMOVE source destination member`
pub fn smove(
    source: impl AsRef<[u8]>,
    destination: impl AsRef<[u8]>,
    member: impl AsRef<[u8]>,
) -> Command {
    Command::new("SMOVE").arg(source).arg(destination).arg(member)
}

/// `SPOP key [count]`
pub fn spop(key: impl AsRef<[u8]>, count: Option<u64>) -> Command {
    let cmd = Command::new("SPOP").arg(key);
    match count {
        Some(n) => cmd.arg_int(n),
        None => cmd,
    }
}

/// `SRANDMEMBER key [count]`
///
/// A negative count lets the server repeat members.
pub fn srandmember(key: impl AsRef<[u8]>, count: Option<i64>) -> Command {
    let cmd = Command::new("SRANDMEMBER").arg(key);
    match count {
        Some(n) => cmd.arg_int(n),
        None => cmd,
    }
}

/// `SREM key member [member …]`
pub fn srem(key: impl AsRef<[u8]>, members: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Command {
    Command::new("SREM").arg(key).args(members)
}

/// `SSCAN key cursor [MATCH pattern] [COUNT count]`
pub fn sscan(key: impl AsRef<[u8]>, cursor: u64, options: &ScanOptions) -> Command {
    let mut cmd = Command::new("SSCAN").arg(key).arg_int(cursor);
    if let Some(pattern) = &options.pattern {
        cmd = cmd.arg("MATCH").arg(pattern);
    }
    if let Some(count) = options.count {
        cmd = cmd.arg("COUNT").arg_int(count);
    }
    cmd
}

/// `SUNION key [key …]`
pub fn sunion(keys: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Command {
    Command::new("SUNION").args(keys)
}

/// `SUNIONSTORE destination key [key …]`
pub fn sunionstore(
    destination: impl AsRef<[u8]>,
    keys: impl IntoIterator<Item = impl AsRef<[u8]>>,
) -> Command {
    Command::new("SUNIONSTORE").arg(destination).args(keys)
}

// ── Tests ──────────────────────────────────────────────────────────
