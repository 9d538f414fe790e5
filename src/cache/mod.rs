//! Cache Module
//!
//! Provides the in-memory entry table with TTL expiration and the shared
//! [`Cache`] handle built on top of it.

pub(crate) mod entry;
mod handle;
mod store;


// Re-export public types
pub use entry::{current_timestamp_nanos, CacheEntry, Expiration, Value, DEFAULT_EXPIRATION, NO_EXPIRATION};
pub use handle::Cache;
pub use store::EntryTable;
