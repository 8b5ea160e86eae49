//! In-Memory Key-Value Store with Lazy Expiry
//!
//! This module implements the core store for emberkv: a single `HashMap`
//! from key to entry, guarded by one exclusive lock.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                    Store                    │
//! │  ┌───────────────────────────────────────┐  │
//! │  │   Mutex<HashMap<Bytes, Entry>>        │  │
//! │  └───────────────────────────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every operation takes the one lock for the duration of a single hash-map
//! access. Nothing blocks on I/O while holding it, so lock hold time is
//! bounded and contention stays negligible for this workload.
//!
//! ## Expiry
//!
//! Entries may carry an absolute monotonic expiry instant. Expiry is purely
//! reactive: `get` removes an expired entry as part of the same lock
//! acquisition that observed it, and `live_keys` filters expired entries out
//! of its listing without deleting them. No background task touches the map.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// A stored value with an optional absolute expiry instant.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored bytes
    pub value: Bytes,
    /// When this entry stops being live (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates an entry without expiry.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry expiring at the given instant.
    pub fn with_expiry(value: Bytes, expires_at: Instant) -> Self {
        Self {
            value,
            expires_at: Some(expires_at),
        }
    }

    /// An entry is live iff it has no expiry or the current instant is
    /// strictly before its expiry.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() >= exp)
            .unwrap_or(false)
    }
}

/// The key-value store shared by every connection.
///
/// Designed to be wrapped in an `Arc` and handed to the dispatcher of each
/// connection task. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use emberkv::storage::Store;
/// use bytes::Bytes;
///
/// let store = Store::new();
/// store.set(Bytes::from("name"), Bytes::from("ember"), None);
/// assert_eq!(store.get(&Bytes::from("name")), Some(Bytes::from("ember")));
/// ```
#[derive(Debug, Default)]
pub struct Store {
    entries: Mutex<HashMap<Bytes, Entry>>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `value` under `key`, unconditionally overwriting any prior
    /// entry. `expires_at` of `None` means the entry never lazily expires.
    pub fn set(&self, key: Bytes, value: Bytes, expires_at: Option<Instant>) {
        let entry = match expires_at {
            Some(at) => Entry::with_expiry(value, at),
            None => Entry::new(value),
        };

        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, entry);
    }

    /// Returns the value for `key`, or `None` if the key is absent or its
    /// entry is no longer live.
    ///
    /// An expired entry is removed from the map as part of this call (lazy
    /// deletion), atomically with the read.
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        let mut entries = self.entries.lock().unwrap();

        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Returns every key whose entry is currently live.
    ///
    /// Expired entries are excluded from the listing but intentionally NOT
    /// removed here; they stay until the next `get` touches them.
    pub fn live_keys(&self) -> Vec<Bytes> {
        let entries = self.entries.lock().unwrap();

        entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Insert path used by the snapshot loader during single-threaded
    /// startup. Same code path as `set`, so a bulk-inserted entry is
    /// indistinguishable from one written over the wire.
    pub fn bulk_insert(&self, key: Bytes, value: Bytes, expires_at: Option<Instant>) {
        self.set(key, value, expires_at);
    }

    /// Number of currently live entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap();
        entries.values().filter(|entry| !entry.is_expired()).count()
    }

    /// Returns true if the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
