//! Reply normalization for the set family.
//!
//! Each command carries exactly one [`Normalizer`]. The same rule runs
//! whether the reply comes back from a direct call or from a flushed
//! pipeline, so a command's result type never depends on the mode it was
//! issued in.

use bytes::Bytes;

use crate::error::{RedsetError, Result};
use crate::resp::types::RespValue;

/// Result of `SADD` / `SREM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affected {
    /// Every requested member was added (or removed).
    All,
    /// Only this many were; the rest already were (or were not) members.
    Partial(i64),
}

impl Affected {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Number of members affected, given how many were requested.
    pub fn count(&self, requested: usize) -> i64 {
        match self {
            Self::All => requested as i64,
            Self::Partial(n) => *n,
        }
    }
}

/// Result of `SPOP` / `SRANDMEMBER`.
///
/// The variant follows whether the caller passed a count, not the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popped {
    /// No count given: one member, or `None` when the set is empty.
    One(Option<Bytes>),
    /// Count given: zero or more members.
    Many(Vec<Bytes>),
}

impl Popped {
    /// Flatten into a list regardless of shape.
    pub fn into_vec(self) -> Vec<Bytes> {
        match self {
            Self::One(member) => member.into_iter().collect(),
            Self::Many(members) => members,
        }
    }
}

/// One page of an `SSCAN` iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; `0` once the iteration is complete.
    pub cursor: u64,
    pub members: Vec<Bytes>,
}

impl ScanPage {
    pub fn is_finished(&self) -> bool {
        self.cursor == 0
    }
}

/// A normalized reply of any set command.
///
/// This is what a flushed pipeline yields per position, since one batch can
/// mix commands with different result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetReply {
    Affected(Affected),
    Flag(bool),
    Count(i64),
    Members(Vec<Bytes>),
    Popped(Popped),
    Page(ScanPage),
}

impl SetReply {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Affected(_) => "affected",
            Self::Flag(_) => "flag",
            Self::Count(_) => "count",
            Self::Members(_) => "members",
            Self::Popped(_) => "popped",
            Self::Page(_) => "scan_page",
        }
    }
}

/// The per-command rule turning a raw reply into a [`SetReply`].
///
/// `apply` consumes the normalizer, so each one runs at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// `SADD` / `SREM`: all-or-count against the number of members sent.
    Affected { requested: usize },
    /// `SISMEMBER` / `SMOVE`: integer 0/1 as a boolean.
    Flag,
    /// `SCARD` and the `*STORE` variants: integer as-is.
    Count,
    /// `SMEMBERS`, `SDIFF`, `SINTER`, `SUNION`: list of members.
    Members,
    /// `SPOP` / `SRANDMEMBER`, shaped by the call-time count.
    Pop { counted: bool },
    /// `SSCAN`: `[cursor, [members…]]`.
    Scan,
}

impl Normalizer {
    pub fn apply(self, raw: RespValue) -> Result<SetReply> {
        if let Some(msg) = raw.as_error_msg() {
            return Err(RedsetError::redis(msg));
        }

        match self {
            Self::Affected { requested } => {
                let n = expect_int(raw)?;
                if usize::try_from(n).is_ok_and(|n| n == requested) {
                    Ok(SetReply::Affected(Affected::All))
                } else {
                    Ok(SetReply::Affected(Affected::Partial(n)))
                }
            }
            Self::Flag => match raw {
                RespValue::Integer(n) => Ok(SetReply::Flag(n != 0)),
                RespValue::Boolean(b) => Ok(SetReply::Flag(b)),
                other => Err(RedsetError::unexpected("integer", other.type_name())),
            },
            Self::Count => expect_int(raw).map(SetReply::Count),
            Self::Members => members(raw).map(SetReply::Members),
            Self::Pop { counted } => pop(raw, counted).map(SetReply::Popped),
            Self::Scan => scan_page(raw).map(SetReply::Page),
        }
    }
}

fn expect_int(raw: RespValue) -> Result<i64> {
    match raw {
        RespValue::Integer(n) => Ok(n),
        other => Err(RedsetError::unexpected("integer", other.type_name())),
    }
}

fn member(raw: RespValue) -> Result<Bytes> {
    let got = raw.type_name();
    raw.into_bytes()
        .ok_or_else(|| RedsetError::unexpected("bulk_string", got))
}

fn members(raw: RespValue) -> Result<Vec<Bytes>> {
    let got = raw.type_name();
    raw.into_elements()
        .ok_or_else(|| RedsetError::unexpected("array", got))?
        .into_iter()
        .map(member)
        .collect()
}

fn pop(raw: RespValue, counted: bool) -> Result<Popped> {
    match (raw, counted) {
        (RespValue::Null, false) => Ok(Popped::One(None)),
        (RespValue::Null, true) => Ok(Popped::Many(Vec::new())),
        (raw @ (RespValue::Array(_) | RespValue::Set(_)), true) => members(raw).map(Popped::Many),
        (raw @ (RespValue::Array(_) | RespValue::Set(_)), false) => {
            let mut items = members(raw)?;
            match items.len() {
                0 => Ok(Popped::One(None)),
                1 => Ok(Popped::One(items.pop())),
                _ => Err(RedsetError::unexpected("bulk_string", "array")),
            }
        }
        (raw, true) => member(raw).map(|m| Popped::Many(vec![m])),
        (raw, false) => member(raw).map(|m| Popped::One(Some(m))),
    }
}

fn scan_page(raw: RespValue) -> Result<ScanPage> {
    let got = raw.type_name();
    let mut parts = raw
        .into_elements()
        .ok_or_else(|| RedsetError::unexpected("array", got))?
        .into_iter();

    let (Some(cursor), Some(page), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RedsetError::Protocol(
            "SSCAN reply must be a two-element array".into(),
        ));
    };

    Ok(ScanPage {
        cursor: parse_cursor(&cursor)?,
        members: members(page)?,
    })
}

/// The cursor arrives as ASCII digits in a bulk string and may use the
/// whole unsigned 64-bit range.
fn parse_cursor(raw: &RespValue) -> Result<u64> {
    if let Some(n) = raw.as_int() {
        return u64::try_from(n)
            .map_err(|_| RedsetError::Protocol(format!("negative SSCAN cursor: {n}")));
    }
    let digits = raw
        .as_bytes()
        .ok_or_else(|| RedsetError::unexpected("bulk_string", raw.type_name()))?;
    let parsed = if !digits.is_empty() && digits.iter().all(u8::is_ascii_digit) {
        std::str::from_utf8(digits).ok().and_then(|s| s.parse::<u64>().ok())
    } else {
        None
    };
    parsed.ok_or_else(|| {
        RedsetError::Protocol(format!(
            "invalid SSCAN cursor: {:?}",
            String::from_utf8_lossy(digits)
        ))
    })
}

// ── Typed extraction ───────────────────────────────────────────────

/// Types a direct-mode call can resolve to.
pub trait FromSetReply: Sized {
    fn from_reply(reply: SetReply) -> Result<Self>;
}

impl FromSetReply for SetReply {
    fn from_reply(reply: SetReply) -> Result<Self> {
        Ok(reply)
    }
}

macro_rules! from_set_reply {
    ($ty:ty, $variant:ident, $expected:literal) => {
        impl FromSetReply for $ty {
            fn from_reply(reply: SetReply) -> Result<Self> {
                match reply {
                    SetReply::$variant(v) => Ok(v),
                    other => Err(RedsetError::unexpected($expected, other.kind())),
                }
            }
        }
    };
}

from_set_reply!(Affected, Affected, "affected");
from_set_reply!(bool, Flag, "flag");
from_set_reply!(i64, Count, "count");
from_set_reply!(Vec<Bytes>, Members, "members");
from_set_reply!(Popped, Popped, "popped");
from_set_reply!(ScanPage, Page, "scan_page");

// ── Tests ──────────────────────────────────────────────────────────
