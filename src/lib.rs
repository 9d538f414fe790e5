//! Mini Cache - A lightweight in-process key-value cache
//!
//! Provides per-entry TTL expiration, a background sweeper, and snapshot
//! persistence to any byte stream.

pub mod cache;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod tasks;

pub use cache::{Cache, Expiration, Value, DEFAULT_EXPIRATION, NO_EXPIRATION};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use snapshot::TypeRegistry;
