//! Secret configuration file storage.
//!
//! Loads the notifier secret and upstream token from `secret.json`, falling
//! back to environment variables for anything the file leaves unset.

use crate::paths::TenantSyncPaths;
use std::fs;
use std::path::PathBuf;
use tenantsync_core::config::SecretConfig;

pub const NOTIFY_SECRET_ENV: &str = "TENANTSYNC_NOTIFY_SECRET";
pub const UPSTREAM_TOKEN_ENV: &str = "TENANTSYNC_UPSTREAM_TOKEN";

/// Errors that can occur during secret storage operations.
#[derive(Debug)]
pub enum SecretStorageError {
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON parsing error.
    ParseError(serde_json::Error),
    /// Config directory not found.
    ConfigDirNotFound,
}

impl std::fmt::Display for SecretStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            SecretStorageError::ParseError(e) => write!(f, "JSON parse error: {}", e),
            SecretStorageError::ConfigDirNotFound => {
                write!(f, "Could not determine home directory")
            }
        }
    }
}

impl std::error::Error for SecretStorageError {}

impl From<std::io::Error> for SecretStorageError {
    fn from(e: std::io::Error) -> Self {
        SecretStorageError::IoError(e)
    }
}

impl From<serde_json::Error> for SecretStorageError {
    fn from(e: serde_json::Error) -> Self {
        SecretStorageError::ParseError(e)
    }
}

/// Read-only storage for `secret.json`.
///
/// # Security Note
///
/// The file is plaintext JSON and should be readable by the service user only.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a SecretStorage with the default path (`~/.config/tenantsync/secret.json`).
    pub fn new() -> Result<Self, SecretStorageError> {
        let path =
            TenantSyncPaths::secret_file().map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Creates a SecretStorage with a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the file. A missing file yields an empty config.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Ok(SecretConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Loads the file, then fills unset secrets from the environment.
    pub fn load_with_env(&self) -> Result<SecretConfig, SecretStorageError> {
        let mut config = self.load()?;
        if config.notify_secret.is_none() {
            config.notify_secret = std::env::var(NOTIFY_SECRET_ENV).ok();
        }
        if config.upstream_token.is_none() {
            config.upstream_token = std::env::var(UPSTREAM_TOKEN_ENV).ok();
        }
        Ok(config)
    }

    /// Returns the path to the secret file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
