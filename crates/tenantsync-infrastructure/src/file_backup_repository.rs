//! AsyncDirStorage-based BackupRepository implementation.

use crate::dto::create_backup_migrator;
use crate::file_config_repository::json_stems;
use crate::storage::{is_not_found, open_dir_storage};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tenantsync_core::backup::{BackupMetadata, BackupRecord, BackupRepository};
use tenantsync_core::error::{Result, TenantSyncError};
use tokio::sync::Mutex;
use version_migrate::AsyncDirStorage;

const ENTITY_NAME: &str = "backup";
const SUBDIR: &str = "backups";

/// One immutable versioned JSON document per snapshot.
///
/// Directory structure:
/// ```text
/// data_dir/
/// └── backups/
///     ├── E1_manual_20260101T000000000Z.json
///     └── E1_pre-change_20260102T101500123Z.json
/// ```
pub struct FileBackupRepository {
    storage: AsyncDirStorage,
    dir: PathBuf,
    // Makes the exists-check and the write in `insert` one step
    insert_lock: Mutex<()>,
}

impl FileBackupRepository {
    /// Creates a repository under `data_dir/backups`.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let migrator = create_backup_migrator().map_err(TenantSyncError::internal)?;
        let storage = open_dir_storage(data_dir, SUBDIR, migrator).await?;
        Ok(Self {
            storage,
            dir: data_dir.join(SUBDIR),
            insert_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load(&self, backup_id: &str) -> Result<Option<BackupRecord>> {
        match self.storage.load::<BackupRecord>(ENTITY_NAME, backup_id).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(TenantSyncError::Serialization {
                format: "json".to_string(),
                message: format!("Failed to load backup '{}': {}", backup_id, e),
            }),
        }
    }
}

/// Backup ids are generated, but they come back from callers, so they get
/// the same file-name guard as entity ids (without the length cap).
fn validate_backup_id(backup_id: &str) -> Result<()> {
    if backup_id.is_empty() {
        return Err(TenantSyncError::missing("backupId"));
    }
    if !backup_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TenantSyncError::validation(
            "backupId",
            "may only contain ASCII letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

#[async_trait]
impl BackupRepository for FileBackupRepository {
    async fn insert(&self, record: &BackupRecord) -> Result<bool> {
        validate_backup_id(&record.backup_id)?;
        let _guard = self.insert_lock.lock().await;

        if self.load(&record.backup_id).await?.is_some() {
            return Ok(false);
        }
        self.storage
            .save(ENTITY_NAME, &record.backup_id, record)
            .await
            .map_err(|e| TenantSyncError::unavailable(format!("Failed to save backup: {}", e)))?;
        Ok(true)
    }

    async fn find_by_id(&self, backup_id: &str) -> Result<Option<BackupRecord>> {
        validate_backup_id(backup_id)?;
        self.load(backup_id).await
    }

    async fn list(&self, entity_id: Option<&str>) -> Result<Vec<BackupMetadata>> {
        let mut metadata = Vec::new();
        for stem in json_stems(&self.dir).await? {
            match self.load(&stem).await {
                Ok(Some(record)) if entity_id.is_none_or(|id| record.entity_id == id) => {
                    metadata.push(record.metadata());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("[FileBackupRepository] Skipping {}: {}", stem, e),
            }
        }

        // Newest first; id breaks ties deterministically
        metadata.sort_by(|a, b| {
            b.captured_at
                .cmp(&a.captured_at)
                .then_with(|| b.backup_id.cmp(&a.backup_id))
        });

        Ok(metadata)
    }

    async fn delete(&self, backup_id: &str) -> Result<bool> {
        validate_backup_id(backup_id)?;
        if self.load(backup_id).await?.is_none() {
            return Ok(false);
        }
        self.storage
            .delete(backup_id)
            .await
            .map_err(|e| TenantSyncError::unavailable(format!("Failed to delete backup: {}", e)))?;
        Ok(true)
    }
}
