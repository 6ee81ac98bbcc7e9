//! Incremental RESP reply parser.
//!
//! [`parse`] takes a byte buffer and returns `Ok((RespValue, bytes_consumed))`,
//! `Err(Incomplete)` when more data is needed, or `Err(Protocol(…))` on
//! malformed input. Bulk payloads are sliced out of the shared `Bytes`
//! buffer, never copied.

use bytes::Bytes;
use memchr::memchr;

use crate::error::{RedsetError, Result};
use crate::resp::types::RespValue;

/// Deepest aggregate nesting accepted from a server.
pub const MAX_DEPTH: usize = 128;

/// Parse one RESP value from the front of `buf`.
pub fn parse(buf: &Bytes) -> Result<(RespValue, usize)> {
    parse_nested(buf, 0)
}

fn parse_nested(buf: &Bytes, depth: usize) -> Result<(RespValue, usize)> {
    let Some(&tag) = buf.first() else {
        return Err(RedsetError::Incomplete);
    };

    match tag {
        b'+' => {
            let (line, next) = read_line(buf, 1)?;
            Ok((RespValue::SimpleString(utf8(line, "simple string")?), next))
        }
        b'-' => {
            let (line, next) = read_line(buf, 1)?;
            Ok((RespValue::Error(utf8(line, "error")?), next))
        }
        b':' => {
            let (line, next) = read_line(buf, 1)?;
            Ok((RespValue::Integer(parse_int_from_bytes(line)?), next))
        }
        b'$' => match read_blob(buf)? {
            (Some(data), next) => Ok((RespValue::BulkString(data), next)),
            (None, next) => Ok((RespValue::Null, next)),
        },
        b'!' => match read_blob(buf)? {
            (Some(data), next) => Ok((RespValue::BulkError(utf8(&data, "bulk error")?), next)),
            (None, _) => Err(RedsetError::Protocol("negative bulk error length".into())),
        },
        b'*' => match parse_elements(buf, depth)? {
            (Some(items), next) => Ok((RespValue::Array(items), next)),
            (None, next) => Ok((RespValue::Null, next)),
        },
        b'~' => match parse_elements(buf, depth)? {
            (Some(items), next) => Ok((RespValue::Set(items), next)),
            (None, _) => Err(RedsetError::Protocol("negative set count".into())),
        },
        b'_' => {
            let (line, next) = read_line(buf, 1)?;
            if !line.is_empty() {
                return Err(RedsetError::Protocol("null type carries a payload".into()));
            }
            Ok((RespValue::Null, next))
        }
        b'#' => {
            let (line, next) = read_line(buf, 1)?;
            match line {
                b"t" => Ok((RespValue::Boolean(true), next)),
                b"f" => Ok((RespValue::Boolean(false), next)),
                _ => Err(RedsetError::Protocol("invalid boolean value".into())),
            }
        }
        b',' => {
            let (line, next) = read_line(buf, 1)?;
            let s = utf8(line, "double")?;
            let d = match s.as_str() {
                "inf" => f64::INFINITY,
                "-inf" => f64::NEG_INFINITY,
                "nan" => f64::NAN,
                _ => s
                    .parse::<f64>()
                    .map_err(|e| RedsetError::Protocol(format!("invalid double: {e}")))?,
            };
            Ok((RespValue::Double(d), next))
        }
        other => Err(RedsetError::Protocol(format!(
            "unknown RESP type byte: 0x{other:02x}"
        ))),
    }
}

/// Convenience wrapper: parse from a byte slice (copies into `Bytes` first).
pub fn parse_slice(buf: &[u8]) -> Result<(RespValue, usize)> {
    parse(&Bytes::copy_from_slice(buf))
}

// ── Helpers ────────────────────────────────────────────────────────

/// Find the `\r` of the next `\r\n` at or after `offset`.
#[inline]
fn find_crlf(buf: &[u8], offset: usize) -> Result<usize> {
    let pos = memchr(b'\r', &buf[offset..]).ok_or(RedsetError::Incomplete)?;
    let cr = offset + pos;
    match buf.get(cr + 1) {
        Some(b'\n') => Ok(cr),
        Some(_) => Err(RedsetError::Protocol("expected \\n after \\r".into())),
        None => Err(RedsetError::Incomplete),
    }
}

/// Read the line starting at `buf[offset]` up to `\r\n`.
/// Returns `(line_bytes, index_after_crlf)`.
#[inline]
fn read_line(buf: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let cr = find_crlf(buf, offset)?;
    Ok((&buf[offset..cr], cr + 2))
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| RedsetError::Protocol(format!("invalid UTF-8 in {what}: {e}")))
}

/// Parse a signed decimal integer without allocating.
fn parse_int_from_bytes(bytes: &[u8]) -> Result<i64> {
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        Some(_) => (false, bytes),
        None => return Err(RedsetError::Protocol("empty integer".into())),
    };
    if digits.is_empty() {
        return Err(RedsetError::Protocol("integer has no digits".into()));
    }

    // Accumulate towards negative so i64::MIN parses.
    let mut n: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(RedsetError::Protocol(format!(
                "invalid byte in integer: 0x{b:02x}"
            )));
        }
        n = n
            .checked_mul(10)
            .and_then(|n| n.checked_sub(i64::from(b - b'0')))
            .ok_or_else(|| RedsetError::Protocol("integer overflow".into()))?;
    }

    if negative {
        Ok(n)
    } else {
        n.checked_neg()
            .ok_or_else(|| RedsetError::Protocol("integer overflow".into()))
    }
}

/// `<tag><len>\r\n<data>\r\n`; a negative length is a null blob.
fn read_blob(buf: &Bytes) -> Result<(Option<Bytes>, usize)> {
    let (line, next) = read_line(buf, 1)?;
    let len = parse_int_from_bytes(line)?;
    if len < 0 {
        return Ok((None, next));
    }

    let data_end = next + len as usize;
    if buf.len() < data_end + 2 {
        return Err(RedsetError::Incomplete);
    }
    if &buf[data_end..data_end + 2] != b"\r\n" {
        return Err(RedsetError::Protocol(
            "bulk payload not terminated by \\r\\n".into(),
        ));
    }
    Ok((Some(buf.slice(next..data_end)), data_end + 2))
}

/// `<tag><count>\r\n<elements>…`; a negative count is a null aggregate.
fn parse_elements(buf: &Bytes, depth: usize) -> Result<(Option<Vec<RespValue>>, usize)> {
    if depth >= MAX_DEPTH {
        return Err(RedsetError::Protocol("RESP nesting too deep".into()));
    }
    let (line, mut next) = read_line(buf, 1)?;
    let count = parse_int_from_bytes(line)?;
    if count < 0 {
        return Ok((None, next));
    }

    let count = count as usize;
    // Bound the preallocation by what the buffer could possibly hold.
    let mut elements = Vec::with_capacity(count.min(buf.len() / 3));
    for _ in 0..count {
        let (val, consumed) = parse_nested(&buf.slice(next..), depth + 1)?;
        elements.push(val);
        next += consumed;
    }
    Ok((Some(elements), next))
}

// ── Tests ──────────────────────────────────────────────────────────
