//! Shared Cache Module
//!
//! The public cache: an [`EntryTable`] behind one reader/writer lock, a
//! background sweeper, and snapshot persistence.

use std::any::Any;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock as StdRwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{current_timestamp_nanos, EntryTable, Expiration, Value};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::snapshot::{codec, TypeRegistry};
use crate::tasks::Sweeper;

// == Cache ==
/// Thread-safe key-value cache with per-entry TTL.
///
/// Reads take the shared lock and writes the exclusive lock of a single
/// `tokio::sync::RwLock`. Expired entries are invisible to lookups at once and
/// are physically removed by the background sweeper.
///
/// Share a cache between tasks by wrapping it in an `Arc`. Dropping the cache
/// stops its sweeper.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use mini_cache::{Cache, Expiration};
///
/// # async fn demo() -> mini_cache::error::Result<()> {
/// let cache = Cache::new(Duration::from_secs(1800), Duration::from_secs(3))?;
/// cache.set("k1", "hello".to_string(), Duration::from_secs(5)).await;
/// assert!(cache.get_as::<String>("k1").await.is_some());
/// cache.set("pinned", 42_i64, Expiration::Never).await;
/// cache.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Cache {
    table: Arc<RwLock<EntryTable>>,
    registry: StdRwLock<TypeRegistry>,
    sweeper: Sweeper,
}

impl Cache {
    // == Constructor ==
    /// Creates a cache and starts its sweeper.
    ///
    /// `default_ttl` must be `Expiration::Never` or a positive duration and
    /// `sweep_interval` must be positive. Must be called from within a Tokio
    /// runtime.
    pub fn new(default_ttl: impl Into<Expiration>, sweep_interval: Duration) -> Result<Self> {
        Self::with_config(CacheConfig::from_parts(default_ttl, sweep_interval)?)
    }

    /// Creates a cache from a config and starts its sweeper.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(CacheError::Runtime(
                "Cache must be created from within a Tokio runtime".to_string(),
            ));
        }

        let table = Arc::new(RwLock::new(EntryTable::new(config.default_ttl)));
        let sweeper = Sweeper::spawn(table.clone(), config.sweep_interval);
        debug!(
            "Cache created: default_ttl={:?}, sweep_interval={:?}",
            config.default_ttl, config.sweep_interval
        );

        Ok(Self {
            table,
            registry: StdRwLock::new(TypeRegistry::new()),
            sweeper,
        })
    }

    // == Set ==
    /// Stores a value, replacing any prior entry and its TTL.
    pub async fn set<V: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: impl Into<Expiration>,
    ) {
        self.table.write().await.set(key.into(), value, ttl.into());
    }

    // == Add ==
    /// Stores a value only if the key has no live entry.
    ///
    /// # Errors
    /// `CacheError::KeyExists` if a live entry is present.
    pub async fn add<V: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: impl Into<Expiration>,
    ) -> Result<()> {
        self.table.write().await.add(key.into(), value, ttl.into())
    }

    // == Replace ==
    /// Overwrites a value only if the key has a live entry.
    ///
    /// # Errors
    /// `CacheError::KeyNotFound` if the key is absent or expired.
    pub async fn replace<V: Any + Send + Sync>(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: impl Into<Expiration>,
    ) -> Result<()> {
        self.table.write().await.replace(key.into(), value, ttl.into())
    }

    // == Get ==
    /// Returns the live value for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.table.read().await.get(key)
    }

    /// Returns the live value for `key` if it is a `V`.
    pub async fn get_as<V: Any + Send + Sync>(&self, key: &str) -> Option<Arc<V>> {
        self.get(key).await.and_then(|value| value.downcast::<V>().ok())
    }

    // == Delete ==
    /// Removes `key`. Returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        self.table.write().await.delete(key)
    }

    // == Count ==
    /// Returns the number of stored entries.
    ///
    /// Expired entries the sweeper has not reached yet are still counted.
    pub async fn count(&self) -> usize {
        self.table.read().await.len()
    }

    // == Flush ==
    /// Discards every entry.
    pub async fn flush(&self) {
        self.table.write().await.clear();
    }

    // == Delete Expired ==
    /// Runs one sweep pass now. Returns the number of entries removed.
    pub async fn delete_expired(&self) -> usize {
        self.table
            .write()
            .await
            .delete_expired(current_timestamp_nanos())
    }

    // == Register ==
    /// Allows values of type `T` to be saved under `tag`.
    pub fn register<T>(&self, tag: impl Into<String>) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register::<T>(tag)
    }

    fn registry(&self) -> TypeRegistry {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // == Save ==
    /// Writes a snapshot of every entry to `writer`.
    ///
    /// The shared lock is held until the write completes, so a slow writer
    /// delays every writer to this cache for as long as it takes.
    ///
    /// # Errors
    /// `CacheError::Serialization` if a value's type is not registered or the
    /// writer fails. The table is never modified.
    pub async fn save<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<()> {
        let registry = self.registry();
        let table = self.table.read().await;

        let bytes = codec::encode(&table, &registry)?;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        debug!("Snapshot saved: {} entries, {} bytes", table.len(), bytes.len());
        Ok(())
    }

    // == Load ==
    /// Reads a snapshot from `reader` and merges it into the table.
    ///
    /// A snapshot entry is written only where the key is absent or its live
    /// entry has expired. The whole snapshot is decoded before anything is
    /// merged, so a failed load leaves the table untouched.
    ///
    /// Returns the number of entries merged.
    ///
    /// # Errors
    /// `CacheError::Deserialization` on read failure or malformed input.
    pub async fn load<R: AsyncRead + Unpin>(&self, reader: &mut R) -> Result<usize> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .await
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;

        let registry = self.registry();
        let decoded = codec::decode(&bytes, &registry, current_timestamp_nanos())?;
        let total = decoded.len();

        let merged = self
            .table
            .write()
            .await
            .merge(decoded, current_timestamp_nanos());

        debug!("Snapshot loaded: {} of {} entries merged", merged, total);
        Ok(merged)
    }

    // == Save To File ==
    /// Creates (or truncates) `path` and saves a snapshot into it.
    ///
    /// The file is always closed; the first error wins.
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref()).await?;
        let saved = self.save(&mut file).await;
        let closed = close(file).await;

        saved?;
        closed
    }

    // == Load File ==
    /// Opens `path` read-only and loads a snapshot from it.
    ///
    /// The handle is dropped on return; nothing was written, so there is
    /// nothing to flush.
    pub async fn load_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        let mut file = File::open(path.as_ref()).await?;
        self.load(&mut file).await
    }

    // == Stop ==
    /// Stops the sweeper. Safe to call any number of times.
    ///
    /// Afterwards expired entries stay in the table until deleted,
    /// overwritten or removed by `delete_expired`.
    pub fn stop(&self) {
        if self.sweeper.stop() {
            debug!("Cache sweeper stop requested");
        }
    }

    /// Stops the sweeper and waits for its task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        self.sweeper.join().await;
    }

    /// Returns whether the sweeper is still scheduled.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }
}

/// Flushes and syncs a written file, surfacing errors that dropping would swallow.
async fn close(mut file: File) -> Result<()> {
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
