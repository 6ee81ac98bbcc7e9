//! RESP command serializer.
//!
//! Encodes command vectors into the RESP bulk string array wire format:
//! `*<N>\r\n$<len>\r\narg1\r\n$<len>\r\narg2\r\n…`

use bytes::Bytes;
use itoa::Buffer;

use crate::command::Command;

/// Encode one command (list of arguments) into RESP wire format.
///
/// Each argument is treated as a binary-safe bulk string.
pub fn encode_command(args: &[Bytes]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(args));
    write_command(&mut buf, args, &mut Buffer::new());
    buf
}

/// Encode multiple commands into a single buffer for pipelined writes.
///
/// Everything is concatenated into one contiguous `Vec<u8>` so the batch
/// goes out in a single `write_all`.
pub fn encode_pipeline(commands: &[Command]) -> Vec<u8> {
    let cap = commands.iter().map(|c| encoded_len(c.args_slice())).sum();
    let mut buf = Vec::with_capacity(cap);
    let mut itoa_buf = Buffer::new();
    for command in commands {
        write_command(&mut buf, command.args_slice(), &mut itoa_buf);
    }
    buf
}

/// Upper bound on the encoded size, so encoding never reallocates.
fn encoded_len(args: &[Bytes]) -> usize {
    // '*' + max_digits(usize) + \r\n, then '$' + len + \r\n + data + \r\n per arg
    let header = 1 + 20 + 2;
    header + args.iter().map(|a| 1 + 20 + 2 + a.len() + 2).sum::<usize>()
}

fn write_command(buf: &mut Vec<u8>, args: &[Bytes], itoa_buf: &mut Buffer) {
    buf.push(b'*');
    buf.extend_from_slice(itoa_buf.format(args.len()).as_bytes());
    buf.extend_from_slice(b"\r\n");

    for arg in args {
        buf.push(b'$');
        buf.extend_from_slice(itoa_buf.format(arg.len()).as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
}

// ── Tests ──────────────────────────────────────────────────────────
