//! Snapshot Loader
//!
//! Pre-populates the [`Store`] from a binary snapshot file before the server
//! starts accepting connections. The format is a subset of the standard RDB
//! layout:
//!
//! ```text
//! ┌───────┬─────────┬──────────────────────────────┬──────┐
//! │ REDIS │ version │ opcode-tagged records ...    │ 0xFF │
//! │ 5 B   │ 4 B     │                              │ EOF  │
//! └───────┴─────────┴──────────────────────────────┴──────┘
//! ```
//!
//! Supported opcodes: `0xFF` end, `0xFE` select-db (ignored), `0xFA`
//! auxiliary field (skipped), `0xFB` resize hint (skipped), `0xFC`/`0xFD`
//! expiry markers, and value type `0` (string). Everything else
//! (32/64-bit lengths, special string encodings, non-string value types)
//! stops the load with an error; records already applied are kept rather
//! than risking a misaligned stream inserting corrupted data.
//!
//! Loading is one-shot and single-threaded; `main` runs it before the
//! listener is bound, so the store sees no concurrent access during it.

use bytes::Bytes;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

use crate::storage::Store;

/// Fixed magic at the start of every snapshot file.
pub const SNAPSHOT_MAGIC: &[u8; 5] = b"REDIS";

/// End-of-file marker.
const OP_EOF: u8 = 0xFF;
/// Select-database marker; the one-byte db index that follows is ignored.
const OP_SELECT_DB: u8 = 0xFE;
/// Auxiliary metadata field: two length-encoded strings (name, value).
const OP_AUX: u8 = 0xFA;
/// Resize hint: two length-encoded integers.
const OP_RESIZE_DB: u8 = 0xFB;
/// Expiry in unix-epoch milliseconds, 8 bytes little-endian.
const OP_EXPIRE_MS: u8 = 0xFC;
/// Expiry in unix-epoch seconds, 4 bytes little-endian.
const OP_EXPIRE_SECS: u8 = 0xFD;
/// The only supported value type: a length-encoded string.
const TYPE_STRING: u8 = 0x00;

/// Errors produced while loading a snapshot.
///
/// None of these are fatal to the server: the caller logs the condition and
/// serves whatever partial or empty store resulted.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be opened or the stream ended mid-record
    #[error("snapshot i/o error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with the `REDIS` magic
    #[error("invalid snapshot magic")]
    BadMagic,

    /// A length-encoded field uses an unsupported encoding form
    #[error("unsupported length encoding: {0:#04x}")]
    UnsupportedLength(u8),

    /// A record carries a value type other than string
    #[error("unsupported value type: {0:#04x}")]
    UnsupportedValueType(u8),
}

/// Loads the snapshot at `path` into `store`.
///
/// # Returns
///
/// The number of entries inserted.
pub fn load_file(path: impl AsRef<Path>, store: &Store) -> Result<usize, SnapshotError> {
    let file = File::open(path.as_ref())?;
    load(BufReader::new(file), store)
}

/// Loads a snapshot from any byte stream into `store`.
///
/// Parses sequentially, inserting records as they are decoded. On a format
/// error the entries applied so far remain in the store.
pub fn load<R: Read>(mut reader: R, store: &Store) -> Result<usize, SnapshotError> {
    let mut magic = [0u8; 5];
    reader.read_exact(&mut magic)?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }

    // Version field, consumed and ignored
    let mut version = [0u8; 4];
    reader.read_exact(&mut version)?;

    let mut loaded = 0usize;

    loop {
        let opcode = match read_opcode(&mut reader)? {
            Some(byte) => byte,
            // Clean end of stream at an opcode boundary counts as a normal end
            None => break,
        };

        match opcode {
            OP_EOF => break,
            OP_SELECT_DB => {
                let _db_index = read_u8(&mut reader)?;
            }
            OP_AUX => {
                skip_string(&mut reader)?;
                skip_string(&mut reader)?;
            }
            OP_RESIZE_DB => {
                read_length(&mut reader)?;
                read_length(&mut reader)?;
            }
            OP_EXPIRE_MS | OP_EXPIRE_SECS => {
                let expire_at_ms = read_expiry(&mut reader, opcode)?;
                let value_type = read_u8(&mut reader)?;
                if read_record(&mut reader, value_type, Some(expire_at_ms), store)? {
                    loaded += 1;
                }
            }
            value_type => {
                if read_record(&mut reader, value_type, None, store)? {
                    loaded += 1;
                }
            }
        }
    }

    Ok(loaded)
}

/// Reads the absolute expiry timestamp following an expiry marker, as
/// unix-epoch milliseconds. `0xFC` carries 8 bytes of milliseconds, `0xFD`
/// 4 bytes of seconds, both little-endian.
fn read_expiry<R: Read>(reader: &mut R, marker: u8) -> Result<u64, SnapshotError> {
    if marker == OP_EXPIRE_MS {
        let mut buf = [0u8; 8];
        reader.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    } else {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(u64::from(u32::from_le_bytes(buf)) * 1000)
    }
}

/// Reads one key/value record and inserts it unless it must be dropped.
///
/// # Returns
///
/// `true` if an entry was inserted. Records whose expiry already lies in the
/// past are fully consumed from the stream but never inserted; a snapshot can
/// legitimately contain them.
fn read_record<R: Read>(
    reader: &mut R,
    value_type: u8,
    expire_at_ms: Option<u64>,
    store: &Store,
) -> Result<bool, SnapshotError> {
    if value_type != TYPE_STRING {
        return Err(SnapshotError::UnsupportedValueType(value_type));
    }

    let key = read_string(reader)?;
    let value = read_string(reader)?;

    let expires_at = match expire_at_ms {
        Some(at_ms) => match remaining_ttl(at_ms) {
            Some(ttl) => Some(Instant::now() + ttl),
            None => {
                debug!(key = ?key, "Dropping snapshot record with past expiry");
                return Ok(false);
            }
        },
        None => None,
    };

    if key.is_empty() || value.is_empty() {
        return Ok(false);
    }

    store.bulk_insert(key, value, expires_at);
    Ok(true)
}

/// Time left until the unix-epoch-millisecond instant `at_ms`, or `None` if
/// it has already passed.
fn remaining_ttl(at_ms: u64) -> Option<Duration> {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    if at_ms > now_ms {
        Some(Duration::from_millis(at_ms - now_ms))
    } else {
        None
    }
}

/// Reads one opcode byte, or `None` on a clean end of stream.
fn read_opcode<R: Read>(reader: &mut R) -> io::Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match reader.read(&mut byte)? {
        0 => Ok(None),
        _ => Ok(Some(byte[0])),
    }
}

fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

/// Decodes the length prefix of a string or integer field.
///
/// The top two bits of the first byte select the form: `00` keeps the low
/// six bits as the length, `01` concatenates them with the next byte into a
/// 14-bit length. The 32/64-bit and special-encoding forms are unsupported.
fn read_length<R: Read>(reader: &mut R) -> Result<usize, SnapshotError> {
    let first = read_u8(reader)?;

    match first >> 6 {
        0b00 => Ok((first & 0x3F) as usize),
        0b01 => {
            let next = read_u8(reader)?;
            Ok((((first & 0x3F) as usize) << 8) | next as usize)
        }
        _ => Err(SnapshotError::UnsupportedLength(first)),
    }
}

/// Reads a length-encoded string.
fn read_string<R: Read>(reader: &mut R) -> Result<Bytes, SnapshotError> {
    let len = read_length(reader)?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Bytes::from(buf))
}

/// Skips a length-encoded string without allocating for its content.
fn skip_string<R: Read>(reader: &mut R) -> Result<(), SnapshotError> {
    let len = read_length(reader)? as u64;
    let skipped = io::copy(&mut reader.by_ref().take(len), &mut io::sink())?;
    if skipped < len {
        return Err(SnapshotError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "snapshot ended inside a skipped field",
        )));
    }
    Ok(())
}
