//! Configuration Module
//!
//! Construction parameters for a cache: default TTL and sweep interval.

use std::time::Duration;

use crate::cache::Expiration;
use crate::error::{CacheError, Result};

/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied to entries set with `Expiration::Default`, None = never expire
    pub default_ttl: Option<Duration>,
    /// Interval between background sweeps
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from a default expiration and a sweep interval.
    ///
    /// The default expiration must be `Expiration::Never` or a positive
    /// duration; `Expiration::Default` has nothing to defer to.
    pub fn from_parts(default_ttl: impl Into<Expiration>, sweep_interval: Duration) -> Result<Self> {
        let default_ttl = match default_ttl.into() {
            Expiration::Never => None,
            Expiration::After(ttl) if !ttl.is_zero() => Some(ttl),
            Expiration::Default | Expiration::After(_) => {
                return Err(CacheError::InvalidConfig(
                    "default TTL must be a positive duration or Never".to_string(),
                ))
            }
        };

        let config = Self {
            default_ttl,
            sweep_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Makes entries set with `Expiration::Default` immortal.
    pub fn without_default_ttl(mut self) -> Self {
        self.default_ttl = None;
        self
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Checks that both durations are usable.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep interval must be positive".to_string(),
            ));
        }
        if self.default_ttl.is_some_and(|ttl| ttl.is_zero()) {
            return Err(CacheError::InvalidConfig(
                "default TTL must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Some(Duration::from_secs(300)),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let config = CacheConfig::new()
            .without_default_ttl()
            .with_sweep_interval(Duration::from_millis(250));
        assert_eq!(config.default_ttl, None);
        assert_eq!(config.sweep_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_from_parts() {
        let config = CacheConfig::from_parts(Duration::from_millis(500), Duration::from_secs(3)).unwrap();
        assert_eq!(config.default_ttl, Some(Duration::from_millis(500)));

        let config = CacheConfig::from_parts(Expiration::Never, Duration::from_secs(3)).unwrap();
        assert_eq!(config.default_ttl, None);
    }

    #[test]
    fn test_from_parts_rejects_default_sentinel() {
        let result = CacheConfig::from_parts(Expiration::Default, Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let config = CacheConfig::default().with_sweep_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_default_ttl_rejected() {
        let config = CacheConfig::default().with_default_ttl(Duration::ZERO);
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));
    }
}
