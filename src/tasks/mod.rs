//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Expiration sweep: removes expired cache entries at a fixed interval

mod sweeper;

pub use sweeper::Sweeper;
