//! Snapshot Module
//!
//! Persists a cache's entries to a byte stream and restores them.

pub mod codec;
mod registry;

pub use codec::SNAPSHOT_VERSION;
pub use registry::TypeRegistry;
