//! AsyncDirStorage-based ConfigRepository implementation.

use crate::dto::create_config_entity_migrator;
use crate::storage::{is_not_found, open_dir_storage};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tenantsync_core::entity::{ConfigEntity, ConfigRepository, validate_entity_id};
use tenantsync_core::error::{Result, TenantSyncError};
use version_migrate::AsyncDirStorage;

const ENTITY_NAME: &str = "config_entity";
const SUBDIR: &str = "entities";

/// One versioned JSON document per entity.
///
/// Directory structure:
/// ```text
/// data_dir/
/// └── entities/
///     ├── E1.json
///     └── E2.json
/// ```
pub struct FileConfigRepository {
    storage: AsyncDirStorage,
    dir: PathBuf,
}

impl FileConfigRepository {
    /// Creates a repository under `data_dir/entities`.
    pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let migrator = create_config_entity_migrator().map_err(TenantSyncError::internal)?;
        let storage = open_dir_storage(data_dir, SUBDIR, migrator).await?;
        Ok(Self {
            storage,
            dir: data_dir.join(SUBDIR),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ConfigRepository for FileConfigRepository {
    async fn find_by_id(&self, entity_id: &str) -> Result<Option<ConfigEntity>> {
        validate_entity_id(entity_id)?;
        match self.storage.load::<ConfigEntity>(ENTITY_NAME, entity_id).await {
            Ok(entity) => Ok(Some(entity)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(TenantSyncError::Serialization {
                format: "json".to_string(),
                message: format!("Failed to load entity '{}': {}", entity_id, e),
            }),
        }
    }

    async fn save(&self, entity: &ConfigEntity) -> Result<()> {
        validate_entity_id(&entity.entity_id)?;
        self.storage
            .save(ENTITY_NAME, &entity.entity_id, entity)
            .await
            .map_err(|e| TenantSyncError::unavailable(format!("Failed to save entity: {}", e)))?;
        tracing::debug!(
            "[FileConfigRepository] Saved entity: {}",
            entity.entity_id
        );
        Ok(())
    }

    async fn delete(&self, entity_id: &str) -> Result<bool> {
        if self.find_by_id(entity_id).await?.is_none() {
            return Ok(false);
        }
        self.storage
            .delete(entity_id)
            .await
            .map_err(|e| TenantSyncError::unavailable(format!("Failed to delete entity: {}", e)))?;
        Ok(true)
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = json_stems(&self.dir).await?;
        ids.sort();
        Ok(ids)
    }
}

/// Returns the file stems of every `*.json` file in `dir`.
///
/// A missing directory yields an empty list. Hidden temporary files are
/// skipped.
pub(crate) async fn json_stems(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut stems = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            if !stem.starts_with('.') {
                stems.push(stem.to_string());
            }
        }
    }
    Ok(stems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    async fn create_test_repository() -> (FileConfigRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let repo = FileConfigRepository::new(temp_dir.path()).await.unwrap();
        (repo, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_find_entity() {
        let (repo, _temp_dir) = create_test_repository().await;

        let mut entity = ConfigEntity::with_defaults("E1");
        entity.apply_section("moderation", json!({"enabled": true}), "alice", Utc::now());
        repo.save(&entity).await.unwrap();

        let found = repo.find_by_id("E1").await.unwrap();
        assert_eq!(found, Some(entity));
        assert!(repo.dir().join("E1.json").exists());
    }

    #[tokio::test]
    async fn test_reopened_repository_reads_saved_entity() {
        let temp_dir = TempDir::new().unwrap();
        let entity = ConfigEntity::with_defaults("E1");
        {
            let repo = FileConfigRepository::new(temp_dir.path()).await.unwrap();
            repo.save(&entity).await.unwrap();
        }

        let repo = FileConfigRepository::new(temp_dir.path()).await.unwrap();
        assert_eq!(repo.find_by_id("E1").await.unwrap(), Some(entity));
    }

    #[tokio::test]
    async fn test_find_unknown_entity() {
        let (repo, _temp_dir) = create_test_repository().await;
        assert!(repo.find_by_id("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (repo, _temp_dir) = create_test_repository().await;

        repo.save(&ConfigEntity::with_defaults("E1")).await.unwrap();
        assert!(repo.delete("E1").await.unwrap());
        assert!(!repo.delete("E1").await.unwrap());
        assert!(repo.find_by_id("E1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_ids_sorted() {
        let (repo, _temp_dir) = create_test_repository().await;
        assert!(repo.list_ids().await.unwrap().is_empty());

        repo.save(&ConfigEntity::with_defaults("b")).await.unwrap();
        repo.save(&ConfigEntity::with_defaults("a")).await.unwrap();

        assert_eq!(repo.list_ids().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_id_never_touches_disk() {
        let (repo, _temp_dir) = create_test_repository().await;
        let err = repo.find_by_id("../escape").await.unwrap_err();
        assert!(err.is_validation());
    }
}
