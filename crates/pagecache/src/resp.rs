//! RESP (REdis Serialization Protocol) client-side framing
//!
//! Encodes command arrays and incrementally parses RESP2 replies, so the
//! remote store adapter works against any Redis-compatible server.

use std::io::Cursor;

use bytes::{Buf, BytesMut};

use crate::error::{Error, Result};

/// Maximum bulk reply size (512 MB), guards against a hostile length prefix
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Maximum array reply length
const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// A single RESP2 reply
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reply {
    /// Simple string: +OK\r\n
    Simple(String),
    /// Error: -ERR message\r\n
    Error(String),
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $5\r\nhello\r\n, nil as $-1\r\n
    Bulk(Option<Vec<u8>>),
    /// Array: *2\r\n... , nil as *-1\r\n
    Array(Option<Vec<Reply>>),
}

/// Encode a command as a RESP array of bulk strings
pub(crate) fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Parse one reply from the front of `buf`, consuming it.
///
/// Returns `Ok(None)` while the buffer does not yet hold a complete reply.
pub(crate) fn parse_reply(buf: &mut BytesMut) -> Result<Option<Reply>> {
    if buf.is_empty() {
        return Ok(None);
    }

    let mut cursor = Cursor::new(&buf[..]);
    match parse_value(&mut cursor)? {
        Some(reply) => {
            let pos = cursor.position() as usize;
            buf.advance(pos);
            Ok(Some(reply))
        }
        None => Ok(None),
    }
}

fn parse_value(cursor: &mut Cursor<&[u8]>) -> Result<Option<Reply>> {
    if !cursor.has_remaining() {
        return Ok(None);
    }

    let type_byte = cursor.get_u8();

    match type_byte {
        b'+' => parse_simple(cursor),
        b'-' => parse_error(cursor),
        b':' => parse_integer(cursor),
        b'$' => parse_bulk(cursor),
        b'*' => parse_array(cursor),
        other => Err(Error::Protocol(format!(
            "unknown reply type: {}",
            other as char
        ))),
    }
}

fn parse_simple(cursor: &mut Cursor<&[u8]>) -> Result<Option<Reply>> {
    match read_line(cursor) {
        Some(line) => Ok(Some(Reply::Simple(into_utf8(line)?))),
        None => Ok(None),
    }
}

fn parse_error(cursor: &mut Cursor<&[u8]>) -> Result<Option<Reply>> {
    match read_line(cursor) {
        Some(line) => Ok(Some(Reply::Error(into_utf8(line)?))),
        None => Ok(None),
    }
}

fn parse_integer(cursor: &mut Cursor<&[u8]>) -> Result<Option<Reply>> {
    match read_line(cursor) {
        Some(line) => {
            let num = into_utf8(line)?
                .parse::<i64>()
                .map_err(|e| Error::Protocol(e.to_string()))?;
            Ok(Some(Reply::Integer(num)))
        }
        None => Ok(None),
    }
}

fn parse_bulk(cursor: &mut Cursor<&[u8]>) -> Result<Option<Reply>> {
    let len_line = match read_line(cursor) {
        Some(line) => line,
        None => return Ok(None),
    };

    let len = into_utf8(len_line)?
        .parse::<i64>()
        .map_err(|e| Error::Protocol(e.to_string()))?;

    if len == -1 {
        return Ok(Some(Reply::Bulk(None)));
    }
    if len < 0 {
        return Err(Error::Protocol(format!("invalid bulk length: {}", len)));
    }

    let len = len as usize;
    if len > MAX_BULK_LEN {
        return Err(Error::Protocol(format!(
            "bulk reply too large: {} bytes (max: {} bytes)",
            len, MAX_BULK_LEN
        )));
    }

    // Payload plus trailing \r\n
    if cursor.remaining() < len + 2 {
        return Ok(None);
    }

    let mut data = vec![0u8; len];
    cursor.copy_to_slice(&mut data);

    if cursor.get_u8() != b'\r' || cursor.get_u8() != b'\n' {
        return Err(Error::Protocol("bulk reply missing terminator".to_string()));
    }

    Ok(Some(Reply::Bulk(Some(data))))
}

fn parse_array(cursor: &mut Cursor<&[u8]>) -> Result<Option<Reply>> {
    let len_line = match read_line(cursor) {
        Some(line) => line,
        None => return Ok(None),
    };

    let len = into_utf8(len_line)?
        .parse::<i64>()
        .map_err(|e| Error::Protocol(e.to_string()))?;

    if len == -1 {
        return Ok(Some(Reply::Array(None)));
    }
    if len < 0 || len as usize > MAX_ARRAY_LEN {
        return Err(Error::Protocol(format!("invalid array length: {}", len)));
    }

    let mut items = Vec::with_capacity(len as usize);
    for _ in 0..len {
        match parse_value(cursor)? {
            Some(item) => items.push(item),
            None => return Ok(None),
        }
    }

    Ok(Some(Reply::Array(Some(items))))
}

/// Read up to the next \r\n, or `None` if no full line is buffered yet
fn read_line(cursor: &mut Cursor<&[u8]>) -> Option<Vec<u8>> {
    let data = *cursor.get_ref();
    let start = cursor.position() as usize;

    let mut i = start;
    while i + 1 < data.len() {
        if data[i] == b'\r' && data[i + 1] == b'\n' {
            cursor.set_position((i + 2) as u64);
            return Some(data[start..i].to_vec());
        }
        i += 1;
    }

    None
}

fn into_utf8(line: Vec<u8>) -> Result<String> {
    String::from_utf8(line).map_err(|e| Error::Protocol(e.to_string()))
}
