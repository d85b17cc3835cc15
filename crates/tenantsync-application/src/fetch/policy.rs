use std::time::Duration;
use tenantsync_core::config::CacheConfig;
use tenantsync_core::upstream::RemoteError;

/// Bounded retry with throttle awareness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included.
    pub max_attempts: u32,
    /// Linear backoff unit for transient failures.
    pub base_delay: Duration,
    /// Declared waits above this fail fast instead of sleeping.
    pub max_throttle_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_throttle_wait: Duration::from_secs(300),
        }
    }
}

impl From<&CacheConfig> for RetryPolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_throttle_wait: Duration::from_secs(config.max_throttle_wait_secs),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `attempt` (1-based) failed with
    /// `error`. `None` means give up now.
    pub fn delay_after(&self, attempt: u32, error: &RemoteError) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match error {
            RemoteError::Throttled { retry_after } if *retry_after > self.max_throttle_wait => None,
            RemoteError::Throttled { retry_after } => Some(*retry_after),
            RemoteError::Transient(_) => Some(self.base_delay * attempt),
            RemoteError::NotFound(_) | RemoteError::Permanent(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_backoff_is_linear() {
        let policy = RetryPolicy::default();
        let err = RemoteError::Transient("503".into());

        assert_eq!(policy.delay_after(1, &err), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_after(2, &err), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_after(3, &err), None);
    }

    #[test]
    fn test_throttle_wait_is_honored_up_to_cap() {
        let policy = RetryPolicy::default();

        let short = RemoteError::Throttled {
            retry_after: Duration::from_secs(5),
        };
        assert_eq!(policy.delay_after(1, &short), Some(Duration::from_secs(5)));

        let long = RemoteError::Throttled {
            retry_after: Duration::from_secs(600),
        };
        assert_eq!(policy.delay_after(1, &long), None);
    }

    #[test]
    fn test_permanent_errors_never_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1, &RemoteError::Permanent("401".into())), None);
        assert_eq!(policy.delay_after(1, &RemoteError::NotFound("x".into())), None);
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            max_attempts: 0,
            base_delay_ms: 250,
            ..CacheConfig::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }
}
