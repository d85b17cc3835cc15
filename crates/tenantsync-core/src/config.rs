//! Service configuration model (`config.toml`).
//!
//! Every field has a default so an empty or missing file yields a working
//! single-host setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RootConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub backup: BackupConfig,
    pub notifier: NotifierConfig,
    pub cache: CacheConfig,
    pub upstream: UpstreamConfig,
    pub session: SessionConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP API binds to.
    pub bind: String,
    /// Directory for rolling log files. Stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
            log_dir: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Root of the entity and backup directories. Platform data dir when unset.
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackupConfig {
    /// Age threshold used by the cleanup action.
    pub retention_days: u32,
    /// Writes to these sections capture a `pre-change` snapshot first.
    pub capture_before_sections: Vec<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            retention_days: 30,
            capture_before_sections: vec!["admins".to_string()],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NotifierConfig {
    /// Agent notification endpoint. Notifications are disabled when unset.
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 5_000,
        }
    }
}

impl NotifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Total attempts per fetch, first call included.
    pub max_attempts: u32,
    /// Linear backoff unit for transient failures.
    pub base_delay_ms: u64,
    /// Longest declared throttle wait we are willing to sleep through.
    pub max_throttle_wait_secs: u64,
    /// How long past its TTL a value may still be served as stale.
    pub max_stale_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_throttle_wait_secs: 300,
            max_stale_secs: 3_600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn max_stale(&self) -> Duration {
        Duration::from_secs(self.max_stale_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the throttled upstream API. The upstream route is
    /// disabled when unset.
    pub base_url: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period before buffered edits are committed.
    pub quiet_period_ms: u64,
    /// How long a committed section ignores authoritative refreshes.
    pub just_committed_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 3_000,
            just_committed_ms: 3_000,
        }
    }
}

/// Secrets kept out of `config.toml` (`secret.json`).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretConfig {
    /// Bearer secret sent with agent notifications.
    pub notify_secret: Option<String>,
    /// Bearer token for the upstream API.
    pub upstream_token: Option<String>,
}
