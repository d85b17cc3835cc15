//! Backup repository trait.

use super::model::{BackupMetadata, BackupRecord};
use crate::error::Result;
use async_trait::async_trait;

/// An abstract repository for immutable backup records.
///
/// Records are write-once: `insert` never overwrites an existing id.
#[async_trait]
pub trait BackupRepository: Send + Sync {
    /// Stores a new record.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Record stored
    /// - `Ok(false)`: A record with this id already exists (nothing written)
    /// - `Err(_)`: Storage failure
    async fn insert(&self, record: &BackupRecord) -> Result<bool>;

    /// Finds a record by id, including its payload.
    async fn find_by_id(&self, backup_id: &str) -> Result<Option<BackupRecord>>;

    /// Lists record metadata, newest first, optionally for one entity only.
    async fn list(&self, entity_id: Option<&str>) -> Result<Vec<BackupMetadata>>;

    /// Deletes a record.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Record removed
    /// - `Ok(false)`: Unknown id
    async fn delete(&self, backup_id: &str) -> Result<bool>;
}
