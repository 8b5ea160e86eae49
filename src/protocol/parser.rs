//! Request Decoder
//!
//! Decodes one client request buffer into its command tokens. A request is
//! framed as an array of bulk strings:
//!
//! ```text
//! *2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n   ->   ["ECHO", "hello"]
//! ```
//!
//! The decoder is deliberately forgiving about bad input: malformed or
//! truncated buffers yield an EMPTY token sequence rather than an error.
//! The dispatcher treats an empty sequence as "no-op, await next buffer",
//! so a garbage buffer never closes the connection or produces a reply.
//!
//! One decode call handles one logical request. Bytes following a complete
//! frame are ignored; accumulating partial frames across reads is the I/O
//! layer's concern, not the decoder's.

use crate::protocol::types::{prefix, CRLF};
use bytes::Bytes;

/// Upper bound on the element count a request frame may announce. A request
/// is a verb plus arguments, so anything near this is already garbage; the
/// cap keeps a hostile count prefix from driving a huge allocation.
pub const MAX_REQUEST_ELEMENTS: usize = 1024;

/// Maximum size of a single bulk-string token (512 MB, matching the usual
/// protocol limit).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Decodes a request buffer into its ordered tokens (verb first).
///
/// Returns an empty vector on any malformed or truncated input.
pub fn decode(buf: &[u8]) -> Vec<Bytes> {
    parse_request(buf).unwrap_or_default()
}

fn parse_request(buf: &[u8]) -> Option<Vec<Bytes>> {
    let mut pos = 0;

    let count = read_prefixed_integer(buf, &mut pos, prefix::ARRAY)?;
    if count < 0 || count as usize > MAX_REQUEST_ELEMENTS {
        return None;
    }
    let count = count as usize;

    let mut tokens = Vec::with_capacity(count);
    for _ in 0..count {
        tokens.push(read_bulk_string(buf, &mut pos)?);
    }

    Some(tokens)
}

/// Reads one `$<len>\r\n<bytes>\r\n` element at `pos`.
fn read_bulk_string(buf: &[u8], pos: &mut usize) -> Option<Bytes> {
    let len = read_prefixed_integer(buf, pos, prefix::BULK_STRING)?;
    if len < 0 || len as usize > MAX_BULK_SIZE {
        return None;
    }
    let len = len as usize;

    let end = pos.checked_add(len)?;
    if buf.len() < end.checked_add(CRLF.len())? {
        return None;
    }
    if &buf[end..end + CRLF.len()] != CRLF {
        return None;
    }

    let token = Bytes::copy_from_slice(&buf[*pos..end]);
    *pos = end + CRLF.len();
    Some(token)
}

/// Reads a `<prefix><integer>\r\n` line at `pos` and advances past it.
fn read_prefixed_integer(buf: &[u8], pos: &mut usize, prefix: u8) -> Option<i64> {
    if buf.get(*pos) != Some(&prefix) {
        return None;
    }

    let line_start = *pos + 1;
    let crlf = find_crlf(&buf[line_start..])?;

    let digits = std::str::from_utf8(&buf[line_start..line_start + crlf]).ok()?;
    let value = digits.parse::<i64>().ok()?;

    *pos = line_start + crlf + CRLF.len();
    Some(value)
}

/// Position of the `\r` of the first CRLF in `buf`, if any.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|window| window == CRLF)
}
