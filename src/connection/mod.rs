//! Client Connection Management
//!
//! Each accepted connection runs in its own tokio task, looping over
//! read → decode → dispatch → reply. The core never sees the socket; it is
//! handed one request buffer at a time and returns bytes to send back.

pub mod handler;

pub use handler::{handle_connection, ConnectionHandler, ConnectionStats};
