//! Snapshot Codec Module
//!
//! Encodes a whole entry table into one self-describing JSON record and
//! decodes it back.
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "k2": { "type": "string", "value": "v2", "expires_at": 1718000000000000000 }
//!   }
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, EntryTable};
use crate::error::{CacheError, Result};
use crate::snapshot::TypeRegistry;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: HashMap<String, SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    #[serde(rename = "type")]
    type_tag: String,
    value: serde_json::Value,
    expires_at: i64,
}

// == Encode ==
/// Serializes every stored entry, expired ones included.
///
/// Fails on the first value whose type is not registered.
pub fn encode(table: &EntryTable, registry: &TypeRegistry) -> Result<Vec<u8>> {
    let mut entries = HashMap::with_capacity(table.len());
    for (key, entry) in table.iter() {
        let (type_tag, value) = registry.encode(entry)?;
        entries.insert(
            key.clone(),
            SnapshotEntry {
                type_tag,
                value,
                expires_at: entry.expires_at,
            },
        );
    }

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        entries,
    };
    serde_json::to_vec(&snapshot).map_err(|e| CacheError::Serialization(e.to_string()))
}

// == Decode ==
/// Parses a snapshot into entries ready to merge.
///
/// Entries already expired at `now` are dropped. Nothing is returned unless
/// the whole snapshot decodes.
pub fn decode(
    bytes: &[u8],
    registry: &TypeRegistry,
    now: i64,
) -> Result<HashMap<String, CacheEntry>> {
    let snapshot: Snapshot =
        serde_json::from_slice(bytes).map_err(|e| CacheError::Deserialization(e.to_string()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(CacheError::Deserialization(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }

    let mut entries = HashMap::with_capacity(snapshot.entries.len());
    for (key, raw) in snapshot.entries {
        if raw.expires_at < 0 {
            return Err(CacheError::Deserialization(format!(
                "negative expiration for key {}",
                key
            )));
        }
        let (value, type_name) = registry.decode(&raw.type_tag, raw.value)?;
        let entry = CacheEntry::from_shared(value, type_name, raw.expires_at);
        if !entry.is_expired_at(now) {
            entries.insert(key, entry);
        }
    }
    Ok(entries)
}
