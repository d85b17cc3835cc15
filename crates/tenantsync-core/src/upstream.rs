//! Contract for volatile, rate-limited upstream reads.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::TenantSyncError;

/// Failure of one call to a rate-limited upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// The upstream asked us to back off for `retry_after`.
    Throttled { retry_after: Duration },
    /// Network-level or 5xx failure; worth retrying.
    Transient(String),
    NotFound(String),
    /// Any other rejection; retrying will not help.
    Permanent(String),
}

impl RemoteError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled { .. } | Self::Transient(_))
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Throttled { retry_after } => {
                write!(f, "throttled (retry after {}s)", retry_after.as_secs())
            }
            Self::Transient(msg) => write!(f, "transient failure: {}", msg),
            Self::NotFound(msg) => write!(f, "not found: {}", msg),
            Self::Permanent(msg) => write!(f, "rejected: {}", msg),
        }
    }
}

impl From<RemoteError> for TenantSyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Throttled { retry_after } => TenantSyncError::Throttled { retry_after },
            RemoteError::Transient(msg) => TenantSyncError::unavailable(msg),
            RemoteError::NotFound(msg) => TenantSyncError::not_found("upstream resource", msg),
            RemoteError::Permanent(msg) => TenantSyncError::unavailable(msg),
        }
    }
}

/// A throttled external API holding per-entity resources (roles, channels
/// and the like). One call, no retry: callers wrap it in a cached fetcher.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    async fn fetch(&self, entity_id: &str, resource: &str) -> Result<Value, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(RemoteError::Transient("502".into()).is_retryable());
        assert!(
            RemoteError::Throttled {
                retry_after: Duration::from_secs(1)
            }
            .is_retryable()
        );
        assert!(!RemoteError::Permanent("401".into()).is_retryable());
    }

    #[test]
    fn test_error_mapping() {
        let err: TenantSyncError = RemoteError::Throttled {
            retry_after: Duration::from_secs(600),
        }
        .into();
        assert!(err.is_throttled());

        let err: TenantSyncError = RemoteError::Transient("timeout".into()).into();
        assert!(err.is_unavailable());

        let err: TenantSyncError = RemoteError::NotFound("E9/roles".into()).into();
        assert!(err.is_not_found());
    }
}
