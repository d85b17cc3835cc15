//! Unified path management for tenantsync files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/tenantsync/          # Config directory
//! ├── config.toml                # Service configuration
//! └── secret.json                # Notifier secret, upstream token
//!
//! ~/.local/share/tenantsync/     # Data directory (overridable)
//! ├── entities/                  # One JSON record per entity
//! │   └── <entityId>.json
//! └── backups/                   # One immutable JSON record per snapshot
//!     └── <backupId>.json
//! ```

use std::path::{Path, PathBuf};

const APP_NAME: &str = "tenantsync";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Path resolution rooted at a data directory.
#[derive(Debug, Clone)]
pub struct TenantSyncPaths {
    data_dir: PathBuf,
}

impl TenantSyncPaths {
    /// Creates paths rooted at `data_dir`, or at the platform data directory
    /// when `None`.
    pub fn new(data_dir: Option<&Path>) -> Result<Self, PathError> {
        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::default_data_dir()?,
        };
        Ok(Self { data_dir })
    }

    /// Returns the platform config directory (e.g. `~/.config/tenantsync/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600).
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Returns the platform data directory (e.g. `~/.local/share/tenantsync/`).
    pub fn default_data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
