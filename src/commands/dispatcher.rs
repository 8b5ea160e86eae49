//! Command Dispatcher
//!
//! Maps a decoded token sequence onto a store or config operation and
//! selects the reply. The dispatcher holds the context built once at
//! startup (the shared [`Store`] and the read-only [`ServerConfig`]) and
//! is cloned into every connection task.
//!
//! ```text
//! tokens ──> dispatch() ──> Store / ServerConfig ──> Option<Reply>
//! ```
//!
//! A `None` result means "send nothing": unknown verbs, under-specified
//! commands and empty token sequences are dropped silently, and the
//! connection simply awaits the next buffer. Clients never see a
//! protocol-level error reply from this server; absence is reported through
//! the null-bulk-string and empty-array sentinels instead.

use crate::config::ServerConfig;
use crate::protocol::Reply;
use crate::storage::Store;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Executes decoded commands against the store and config registry.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
    config: Arc<ServerConfig>,
}

impl Dispatcher {
    /// Creates a dispatcher over the shared store and config.
    pub fn new(store: Arc<Store>, config: Arc<ServerConfig>) -> Self {
        Self { store, config }
    }

    /// Executes one decoded command.
    ///
    /// # Returns
    ///
    /// The reply to encode and send, or `None` when the buffer should be
    /// ignored without an answer.
    pub fn dispatch(&self, tokens: &[Bytes]) -> Option<Reply> {
        let (verb, args) = tokens.split_first()?;

        // Verbs match case-insensitively
        let verb = verb.to_ascii_uppercase();
        match verb.as_slice() {
            b"PING" => Some(Reply::pong()),
            b"ECHO" => self.cmd_echo(args),
            b"SET" => self.cmd_set(args),
            b"GET" => self.cmd_get(args),
            b"KEYS" => self.cmd_keys(args),
            b"CONFIG" => self.cmd_config(args),
            _ => {
                trace!(verb = ?verb, "Ignoring unknown command");
                None
            }
        }
    }

    /// ECHO message - replies the argument byte-for-byte.
    fn cmd_echo(&self, args: &[Bytes]) -> Option<Reply> {
        let message = args.first()?;
        Some(Reply::Bulk(message.clone()))
    }

    /// SET key value [PX milliseconds]
    fn cmd_set(&self, args: &[Bytes]) -> Option<Reply> {
        if args.len() < 2 {
            return None;
        }

        let key = args[0].clone();
        let value = args[1].clone();
        let expires_at = parse_px_option(&args[2..]);

        self.store.set(key, value, expires_at);
        Some(Reply::ok())
    }

    /// GET key - live value, or the null sentinel for absent/expired keys.
    fn cmd_get(&self, args: &[Bytes]) -> Option<Reply> {
        let key = args.first()?;

        match self.store.get(key) {
            Some(value) => Some(Reply::Bulk(value)),
            None => Some(Reply::NullBulk),
        }
    }

    /// KEYS pattern - only the literal `*` pattern (all live keys) is
    /// supported; anything else is treated as an unsupported request form.
    fn cmd_keys(&self, args: &[Bytes]) -> Option<Reply> {
        let pattern = args.first()?;
        if pattern.as_ref() != b"*" {
            trace!(pattern = ?pattern, "Ignoring unsupported KEYS pattern");
            return None;
        }

        Some(Reply::Array(self.store.live_keys()))
    }

    /// CONFIG GET parameter - `[name, value]` for a known registry key,
    /// the empty array otherwise.
    fn cmd_config(&self, args: &[Bytes]) -> Option<Reply> {
        let sub = args.first()?.to_ascii_uppercase();
        if sub.as_slice() != b"GET" {
            return None;
        }

        let param = args.get(1)?;
        let known = std::str::from_utf8(param)
            .ok()
            .and_then(|name| self.config.get(name));

        match known {
            Some(value) => Some(Reply::Array(vec![
                param.clone(),
                Bytes::from(value.to_string()),
            ])),
            None => Some(Reply::Array(vec![])),
        }
    }
}

/// Scans SET's trailing tokens for a `PX <milliseconds>` option and turns it
/// into an absolute expiry instant.
///
/// A `PX` whose argument does not parse as a non-negative integer is treated
/// as if no `PX` option was given at all: no expiry, no error to the client.
fn parse_px_option(options: &[Bytes]) -> Option<Instant> {
    let flag = options.first()?;
    if !flag.eq_ignore_ascii_case(b"PX") {
        return None;
    }

    let millis = std::str::from_utf8(options.get(1)?)
        .ok()?
        .parse::<u64>()
        .ok()?;

    Instant::now().checked_add(Duration::from_millis(millis))
}
