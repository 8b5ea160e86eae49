//! Wire Protocol Codec
//!
//! Decoding turns one raw request buffer into command tokens; encoding turns
//! a [`Reply`] back into wire bytes.
//!
//! ```
//! use emberkv::protocol::{decode, Reply};
//! use bytes::Bytes;
//!
//! let tokens = decode(b"*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n");
//! assert_eq!(tokens[0], Bytes::from("ECHO"));
//!
//! let reply = Reply::bulk(Bytes::from("hello"));
//! assert_eq!(reply.serialize(), b"$5\r\nhello\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{decode, MAX_BULK_SIZE, MAX_REQUEST_ELEMENTS};
pub use types::Reply;
