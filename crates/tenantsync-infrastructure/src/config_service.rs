//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml` and applies environment
//! overrides on top.

use crate::paths::TenantSyncPaths;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tenantsync_core::config::RootConfig;
use tenantsync_core::error::{Result, TenantSyncError};

pub const BIND_ENV: &str = "TENANTSYNC_BIND";
pub const DATA_DIR_ENV: &str = "TENANTSYNC_DATA_DIR";
pub const NOTIFY_URL_ENV: &str = "TENANTSYNC_NOTIFY_URL";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a service reading `path`, or the platform config file when `None`.
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => TenantSyncPaths::config_file()
                .map_err(|e| TenantSyncError::config(e.to_string()))?,
        };
        Ok(Self {
            path,
            config: Arc::new(RwLock::new(None)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the root configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<RootConfig> {
        if let Some(cached) = self.read_cache() {
            return Ok(cached);
        }

        let mut loaded = Self::load_file(&self.path)?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        if let Ok(mut cache) = self.config.write() {
            *cache = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cache) = self.config.write() {
            *cache = None;
        }
    }

    fn read_cache(&self) -> Option<RootConfig> {
        self.config.read().ok().and_then(|cache| cache.clone())
    }

    /// Reads `path`. A missing file yields the defaults.
    fn load_file(path: &Path) -> Result<RootConfig> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    "[ConfigService] No config file at {}, using defaults",
                    path.display()
                );
                return Ok(RootConfig::default());
            }
            Err(e) => {
                return Err(TenantSyncError::config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(toml::from_str(&content)?)
    }
}

/// Applies `TENANTSYNC_*` overrides using `lookup` to read variables.
fn apply_env_overrides(config: &mut RootConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(bind) = lookup(BIND_ENV) {
        config.server.bind = bind;
    }
    if let Some(data_dir) = lookup(DATA_DIR_ENV) {
        config.store.data_dir = Some(PathBuf::from(data_dir));
    }
    if let Some(url) = lookup(NOTIFY_URL_ENV) {
        config.notifier.url = Some(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::new(Some(&temp_dir.path().join("config.toml"))).unwrap();

        let config = ConfigService::load_file(service.path()).unwrap();
        assert_eq!(config, RootConfig::default());
    }

    #[test]
    fn test_loads_and_caches_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[backup]\nretention_days = 7\n").unwrap();

        let service = ConfigService::new(Some(&path)).unwrap();
        assert_eq!(service.get_config().unwrap().backup.retention_days, 7);

        // Cached until invalidated
        std::fs::write(&path, "[backup]\nretention_days = 9\n").unwrap();
        assert_eq!(service.get_config().unwrap().backup.retention_days, 7);
        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().backup.retention_days, 9);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[backup\n").unwrap();

        let service = ConfigService::new(Some(&path)).unwrap();
        assert!(service.get_config().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (BIND_ENV, "0.0.0.0:9000"),
            (NOTIFY_URL_ENV, "http://agent/notify"),
        ]
        .into_iter()
        .collect();

        let mut config = RootConfig::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.notifier.url.as_deref(), Some("http://agent/notify"));
        assert!(config.store.data_dir.is_none());
    }
}
