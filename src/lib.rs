//! # emberkv - A Minimal In-Memory Key-Value Server
//!
//! emberkv is a small Redis-compatible, in-memory key-value server written
//! in Rust. It speaks the array-of-bulk-strings form of the RESP protocol,
//! supports per-key time-to-live with lazy expiry, and can warm-start from
//! a binary snapshot file (a subset of the standard RDB format).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         emberkv                             │
//! │                                                             │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐           │
//! │  │ TCP Server │──>│ Connection │──>│ Dispatcher │           │
//! │  │ (Listener) │   │  Handler   │   │            │           │
//! │  └────────────┘   └────────────┘   └─────┬──────┘           │
//! │                                          │                  │
//! │  ┌────────────┐                          ▼                  │
//! │  │  Protocol  │               ┌─────────────────────┐       │
//! │  │   Codec    │               │        Store        │       │
//! │  └────────────┘               │ Mutex<HashMap<...>> │       │
//! │                               └──────────▲──────────┘       │
//! │                                          │                  │
//! │                               ┌──────────┴──────────┐       │
//! │                               │   Snapshot Loader   │       │
//! │                               │  (once, at startup) │       │
//! │                               └─────────────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING` - always replies `PONG`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//! - `KEYS *`
//! - `CONFIG GET dir|dbfilename`
//!
//! ## Design Highlights
//!
//! ### One lock, whole map
//!
//! The store is a single `HashMap` behind one `Mutex`. Operations hold the
//! lock for exactly one hash-map access with no I/O, so contention stays
//! negligible and every `set`/`get` is atomic and fully visible.
//!
//! ### Lazy expiry
//!
//! A key with a TTL is removed when a `GET` next observes it expired;
//! `KEYS *` filters expired entries out of its listing without deleting
//! them. No background task sweeps the map.
//!
//! ### Snapshot warm-start
//!
//! Before the listener is bound, `main` loads `<dir>/<dbfilename>` into the
//! store. A missing or malformed snapshot is never fatal: the server logs
//! the condition and starts with whatever partial or empty store resulted.
//!
//! ### Silence over errors
//!
//! Malformed buffers and unknown commands are dropped without a reply and
//! without closing the connection; absence is reported through the `$-1`
//! and `*0` sentinels, never through protocol-error replies.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::Dispatcher;
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{decode, Reply};
pub use storage::{load_snapshot_file, SnapshotError, Store};

/// The default port emberkv listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host emberkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
