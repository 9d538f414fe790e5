//! Entry Table Module
//!
//! HashMap storage with TTL semantics. The table itself is not synchronized;
//! [`Cache`](crate::Cache) guards it with a single reader/writer lock.

use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;

use crate::cache::entry::current_timestamp_nanos;
use crate::cache::{CacheEntry, Expiration, Value};
use crate::error::{CacheError, Result};

// == Entry Table ==
/// Key-value storage with per-entry deadlines.
#[derive(Debug, Default)]
pub struct EntryTable {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// TTL for entries set with `Expiration::Default`, None = never expire
    default_ttl: Option<Duration>,
}

impl EntryTable {
    // == Constructor ==
    /// Creates an empty table with the given default TTL.
    pub fn new(default_ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value unconditionally, replacing any prior entry and its TTL.
    pub fn set<V: Any + Send + Sync>(&mut self, key: String, value: V, ttl: Expiration) {
        let expires_at = ttl.deadline(self.default_ttl, current_timestamp_nanos());
        self.entries.insert(key, CacheEntry::new(value, expires_at));
    }

    // == Add ==
    /// Stores a value only if no live entry exists for the key.
    pub fn add<V: Any + Send + Sync>(&mut self, key: String, value: V, ttl: Expiration) -> Result<()> {
        if self.get(&key).is_some() {
            return Err(CacheError::KeyExists(key));
        }
        self.set(key, value, ttl);
        Ok(())
    }

    // == Replace ==
    /// Stores a value only if a live entry exists for the key.
    pub fn replace<V: Any + Send + Sync>(
        &mut self,
        key: String,
        value: V,
        ttl: Expiration,
    ) -> Result<()> {
        if self.get(&key).is_none() {
            return Err(CacheError::KeyNotFound(key));
        }
        self.set(key, value, ttl);
        Ok(())
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries count as misses but are left in place for the sweeper.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_entry(key).map(|entry| entry.value.clone())
    }

    /// Retrieves a live entry by key.
    pub fn get_entry(&self, key: &str) -> Option<&CacheEntry> {
        let now = current_timestamp_nanos();
        self.entries.get(key).filter(|entry| !entry.is_expired_at(now))
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Flush ==
    /// Discards every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // == Delete Expired ==
    /// Removes all entries whose deadline has passed at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn delete_expired(&mut self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    // == Merge ==
    /// Inserts decoded entries where the key is absent or its entry expired.
    ///
    /// Live entries always win. Returns the number of entries written.
    pub fn merge(&mut self, incoming: HashMap<String, CacheEntry>, now: i64) -> usize {
        let mut merged = 0;
        for (key, entry) in incoming {
            let vacant = self
                .entries
                .get(&key)
                .map_or(true, |existing| existing.is_expired_at(now));
            if vacant {
                self.entries.insert(key, entry);
                merged += 1;
            }
        }
        merged
    }

    /// Iterates over every stored entry, expired ones included.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired but unswept ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
