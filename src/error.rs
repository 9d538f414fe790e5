//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Add was called on a key holding a live entry
    #[error("Key already exists: {0}")]
    KeyExists(String),

    /// Replace was called on an absent or expired key
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A value could not be encoded, or the snapshot could not be written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A snapshot could not be read or decoded
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// File open/create/close failure in the file wrappers
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected construction parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A snapshot type tag is already bound to another type
    #[error("Type tag already registered: {0}")]
    DuplicateTypeTag(String),

    /// No Tokio runtime to host the sweeper
    #[error("Runtime error: {0}")]
    Runtime(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_key() {
        let err = CacheError::KeyExists("user:1".to_string());
        assert_eq!(err.to_string(), "Key already exists: user:1");

        let err = CacheError::KeyNotFound("user:2".to_string());
        assert_eq!(err.to_string(), "Key not found: user:2");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
