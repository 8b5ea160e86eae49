//! Storage
//!
//! The shared key-value [`Store`] plus the [`snapshot`] loader that seeds it
//! from disk before the server starts accepting connections.
//!
//! ```
//! use emberkv::storage::Store;
//! use bytes::Bytes;
//!
//! let store = Store::new();
//! store.set(Bytes::from("name"), Bytes::from("ember"), None);
//! assert_eq!(store.get(&Bytes::from("name")), Some(Bytes::from("ember")));
//! ```

pub mod snapshot;
pub mod store;

pub use snapshot::{load as load_snapshot, load_file as load_snapshot_file, SnapshotError};
pub use store::{Entry, Store};
