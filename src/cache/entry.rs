//! Cache Entry Module
//!
//! Defines individual cache entries, the stored value type, and TTL requests.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

// == Value ==
/// A stored value of any thread-safe type.
pub type Value = Arc<dyn Any + Send + Sync>;

// == Expiration ==
/// Requested lifetime for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Use the cache's configured default TTL
    #[default]
    Default,
    /// Never expires
    Never,
    /// Expires this long after the write
    After(Duration),
}

/// Sentinel for "use the cache default".
pub const DEFAULT_EXPIRATION: Expiration = Expiration::Default;

/// Sentinel for "never expires".
pub const NO_EXPIRATION: Expiration = Expiration::Never;

impl From<Duration> for Expiration {
    /// A zero duration means the default TTL.
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Expiration::Default
        } else {
            Expiration::After(ttl)
        }
    }
}

impl Expiration {
    // == Deadline ==
    /// Resolves this request to an absolute deadline in nanoseconds, 0 = never.
    pub fn deadline(self, default_ttl: Option<Duration>, now: i64) -> i64 {
        let ttl = match self {
            Expiration::Never => None,
            Expiration::After(ttl) if !ttl.is_zero() => Some(ttl),
            Expiration::Default | Expiration::After(_) => default_ttl,
        };

        match ttl {
            Some(ttl) => {
                let nanos = i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX);
                now.saturating_add(nanos)
            }
            None => 0,
        }
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and deadline.
#[derive(Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Rust type name of the value, for error messages
    pub type_name: &'static str,
    /// Expiration timestamp (Unix nanoseconds), 0 = no expiration
    pub expires_at: i64,
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("type_name", &self.type_name)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry from a concrete value and an absolute deadline.
    pub fn new<V: Any + Send + Sync>(value: V, expires_at: i64) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<V>(),
            expires_at,
        }
    }

    /// Creates an entry from an already shared value.
    pub fn from_shared(value: Value, type_name: &'static str, expires_at: i64) -> Self {
        Self {
            value,
            type_name,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks whether the deadline has passed at `now`.
    ///
    /// An entry is expired strictly after its deadline; immortal entries
    /// (deadline 0) never expire.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at > 0 && now > self.expires_at
    }

    /// Borrows the value as `V` if that is its type.
    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        self.value.downcast_ref::<V>()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in nanoseconds.
pub fn current_timestamp_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_entry_never_expires() {
        let entry = CacheEntry::new("value".to_string(), 0);

        assert_eq!(entry.downcast_ref::<String>().unwrap(), "value");
        assert!(!entry.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_entry_expiration() {
        let deadline = Expiration::After(Duration::from_millis(50)).deadline(None, current_timestamp_nanos());
        let entry = CacheEntry::new(7_i64, deadline);

        assert!(!entry.is_expired_at(current_timestamp_nanos()));

        sleep(Duration::from_millis(80));

        assert!(entry.is_expired_at(current_timestamp_nanos()));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(1_u64, 1_000);

        // Expired strictly after the deadline
        assert!(!entry.is_expired_at(1_000));
        assert!(entry.is_expired_at(1_001));
    }

    #[test]
    fn test_deadline_resolution() {
        let now = 1_000_000;
        let default_ttl = Some(Duration::from_nanos(500));

        assert_eq!(Expiration::Default.deadline(default_ttl, now), now + 500);
        assert_eq!(Expiration::Default.deadline(None, now), 0);
        assert_eq!(Expiration::Never.deadline(default_ttl, now), 0);
        assert_eq!(
            Expiration::After(Duration::from_nanos(20)).deadline(default_ttl, now),
            now + 20
        );
        assert_eq!(Expiration::After(Duration::ZERO).deadline(default_ttl, now), now + 500);
    }

    #[test]
    fn test_deadline_saturates() {
        let deadline = Expiration::After(Duration::MAX).deadline(None, 10);
        assert_eq!(deadline, i64::MAX);
    }

    #[test]
    fn test_zero_duration_is_default() {
        assert_eq!(Expiration::from(Duration::ZERO), DEFAULT_EXPIRATION);
        assert_eq!(
            Expiration::from(Duration::from_secs(5)),
            Expiration::After(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_type_name_recorded() {
        let entry = CacheEntry::new(vec![1_u8, 2, 3], 0);
        assert_eq!(entry.type_name, std::any::type_name::<Vec<u8>>());
        assert!(entry.downcast_ref::<String>().is_none());
    }
}
