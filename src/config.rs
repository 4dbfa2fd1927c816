//! Engine configuration with validation

use crate::error::ConfigError;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Maximum retry budget per page fetch
const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Default worker count for the size command
pub const DEFAULT_WORKERS: usize = 10;

/// Default retry attempts per page fetch
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Validated runtime configuration for a size computation
#[derive(Debug, Clone)]
pub struct SizeConfig {
    /// Number of base worker threads (the pool is enlarged by one slot
    /// per initially-submitted locator, see the coordinator)
    pub worker_count: usize,

    /// Retry attempts per page fetch before the error becomes fatal
    pub retry_attempts: u32,

    /// Show progress indicator
    pub show_progress: bool,
}

impl SizeConfig {
    /// Create a configuration with the given worker count, validating bounds
    pub fn new(worker_count: usize) -> Result<Self, ConfigError> {
        Self {
            worker_count,
            ..Self::default()
        }
        .validated()
    }

    /// Validate field ranges, consuming and returning the config
    pub fn validated(self) -> Result<Self, ConfigError> {
        if self.worker_count == 0 || self.worker_count > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: self.worker_count,
                max: MAX_WORKERS,
            });
        }

        if self.retry_attempts == 0 || self.retry_attempts > MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::InvalidRetryAttempts {
                attempts: self.retry_attempts,
                max: MAX_RETRY_ATTEMPTS,
            });
        }

        Ok(self)
    }
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKERS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            show_progress: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SizeConfig::default().validated().unwrap();
        assert_eq!(config.worker_count, DEFAULT_WORKERS);
        assert_eq!(config.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_worker_count_bounds() {
        assert!(SizeConfig::new(0).is_err());
        assert!(SizeConfig::new(1).is_ok());
        assert!(SizeConfig::new(MAX_WORKERS).is_ok());
        assert!(SizeConfig::new(MAX_WORKERS + 1).is_err());
    }

    #[test]
    fn test_retry_attempts_bounds() {
        let config = SizeConfig {
            retry_attempts: 0,
            ..SizeConfig::default()
        };
        assert!(config.validated().is_err());

        let config = SizeConfig {
            retry_attempts: MAX_RETRY_ATTEMPTS + 1,
            ..SizeConfig::default()
        };
        assert!(config.validated().is_err());
    }
}
