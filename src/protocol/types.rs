//! Wire Reply Types
//!
//! The reply shapes the dispatcher can select, with their RESP wire
//! encodings:
//!
//! - simple status: `+OK\r\n`
//! - bulk string: `$5\r\nhello\r\n`
//! - null bulk string: `$-1\r\n` (key absent or expired)
//! - array of bulk strings: `*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n`
//! - empty array: `*0\r\n` (lookup yielded nothing)

use bytes::Bytes;

/// The CRLF terminator used throughout the wire protocol
pub const CRLF: &[u8] = b"\r\n";

/// Wire protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A reply selected by the dispatcher, ready to be encoded onto the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Single-line status acknowledgement, e.g. `+OK\r\n`
    Simple(&'static str),

    /// Binary-safe length-prefixed string: `$<len>\r\n<bytes>\r\n`
    Bulk(Bytes),

    /// The absent/expired sentinel: `$-1\r\n`
    NullBulk,

    /// Array of bulk strings: `*<count>\r\n` + each element bulk-encoded.
    /// An empty vector encodes as the empty array `*0\r\n`.
    Array(Vec<Bytes>),
}

impl Reply {
    /// The `+OK\r\n` acknowledgement.
    pub fn ok() -> Self {
        Reply::Simple("OK")
    }

    /// The `+PONG\r\n` acknowledgement.
    pub fn pong() -> Self {
        Reply::Simple("PONG")
    }

    /// A bulk string reply.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    /// Encodes this reply to wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Encodes this reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Reply::Bulk(data) => {
                serialize_bulk(data, buf);
            }
            Reply::NullBulk => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            Reply::Array(elements) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(elements.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for element in elements {
                    serialize_bulk(element, buf);
                }
            }
        }
    }
}

fn serialize_bulk(data: &[u8], buf: &mut Vec<u8>) {
    buf.push(prefix::BULK_STRING);
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(data);
    buf.extend_from_slice(CRLF);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_serialize() {
        assert_eq!(Reply::ok().serialize(), b"+OK\r\n");
        assert_eq!(Reply::pong().serialize(), b"+PONG\r\n");
    }

    #[test]
    fn test_bulk_serialize() {
        let reply = Reply::bulk(Bytes::from("hello"));
        assert_eq!(reply.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_bulk_binary_safe() {
        let reply = Reply::bulk(Bytes::from(&b"he\x00lo"[..]));
        assert_eq!(reply.serialize(), b"$5\r\nhe\x00lo\r\n");
    }

    #[test]
    fn test_null_bulk_serialize() {
        assert_eq!(Reply::NullBulk.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_array_serialize() {
        let reply = Reply::Array(vec![Bytes::from("dir"), Bytes::from("/tmp")]);
        assert_eq!(reply.serialize(), b"*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n");
    }

    #[test]
    fn test_empty_array_serialize() {
        assert_eq!(Reply::Array(vec![]).serialize(), b"*0\r\n");
    }
}
