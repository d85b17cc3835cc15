//! Backup Manager: point-in-time snapshots of whole entities.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tenantsync_core::backup::{BackupMetadata, BackupRecord, BackupRepository, generate_backup_id};
use tenantsync_core::entity::{ConfigEntity, validate_entity_id};
use tenantsync_core::error::{Result, TenantSyncError};

use crate::store::{CommitHook, VersionedStore};

/// Suffixed ids tried when two snapshots land on the same millisecond.
const MAX_ID_ATTEMPTS: u32 = 16;

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    pub kept: usize,
}

impl PruneReport {
    pub fn removed(&self) -> usize {
        self.deleted.len()
    }
}

pub struct BackupManager {
    store: Arc<VersionedStore>,
    repository: Arc<dyn BackupRepository>,
}

impl BackupManager {
    pub fn new(store: Arc<VersionedStore>, repository: Arc<dyn BackupRepository>) -> Self {
        Self { store, repository }
    }

    /// Snapshots the entity's current contents (defaults if never written).
    pub async fn capture(&self, entity_id: &str, reason: &str) -> Result<BackupMetadata> {
        let entity = self.store.read_entity(entity_id).await?;
        self.snapshot(&entity, reason).await
    }

    /// Persists `entity` as a new immutable snapshot.
    pub async fn snapshot(&self, entity: &ConfigEntity, reason: &str) -> Result<BackupMetadata> {
        let captured_at = Utc::now();
        let size_bytes = serde_json::to_vec(entity)?.len() as u64;
        let base_id = generate_backup_id(&entity.entity_id, reason, captured_at);

        for attempt in 0..MAX_ID_ATTEMPTS {
            let backup_id = if attempt == 0 {
                base_id.clone()
            } else {
                format!("{}-{}", base_id, attempt)
            };
            let record = BackupRecord {
                backup_id,
                entity_id: entity.entity_id.clone(),
                reason: reason.to_string(),
                captured_at,
                size_bytes,
                payload: entity.clone(),
            };

            if self.repository.insert(&record).await? {
                tracing::info!(
                    "[BackupManager] Captured {} ({} bytes, reason: {})",
                    record.backup_id,
                    size_bytes,
                    reason
                );
                return Ok(record.metadata());
            }
        }

        Err(TenantSyncError::internal(format!(
            "Could not allocate a backup id for {}",
            base_id
        )))
    }

    /// Lists snapshot metadata, newest first.
    pub async fn list(&self, entity_id: Option<&str>) -> Result<Vec<BackupMetadata>> {
        if let Some(entity_id) = entity_id {
            validate_entity_id(entity_id)?;
        }
        self.repository.list(entity_id).await
    }

    /// Returns the full snapshot including its payload.
    pub async fn get(&self, backup_id: &str) -> Result<BackupRecord> {
        self.repository
            .find_by_id(backup_id)
            .await?
            .ok_or_else(|| TenantSyncError::not_found("backup", backup_id))
    }

    /// Overwrites the entity with the snapshot's payload.
    ///
    /// The entity's current state is captured first with reason
    /// `pre-restore`, so a restore is itself undoable.
    pub async fn restore(self: &Arc<Self>, backup_id: &str) -> Result<ConfigEntity> {
        let record = self.get(backup_id).await?;
        let hook = CaptureBefore::new(self.clone(), tenantsync_core::backup::reason::PRE_RESTORE);

        let restored = self.store.replace_entity(record.payload, Some(&hook)).await?;
        tracing::info!(
            "[BackupManager] Restored {} from {}",
            restored.entity_id,
            backup_id
        );
        Ok(restored)
    }

    /// Deletes one snapshot.
    pub async fn delete(&self, backup_id: &str) -> Result<()> {
        if self.repository.delete(backup_id).await? {
            Ok(())
        } else {
            Err(TenantSyncError::not_found("backup", backup_id))
        }
    }

    /// Deletes snapshots older than `max_age_days`.
    ///
    /// An age reaching past the earliest representable time prunes nothing.
    pub async fn prune(&self, max_age_days: u32) -> Result<PruneReport> {
        let cutoff = Duration::try_days(i64::from(max_age_days))
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.prune_older_than(cutoff).await
    }

    /// Deletes snapshots captured before `cutoff`, except the newest snapshot
    /// of each entity which is always kept.
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<PruneReport> {
        let all = self.repository.list(None).await?;
        let mut seen_entities = HashSet::new();
        let mut report = PruneReport::default();

        // Newest first, so the first occurrence per entity is its newest.
        for metadata in all {
            let is_newest = seen_entities.insert(metadata.entity_id.clone());
            if is_newest || metadata.captured_at >= cutoff {
                report.kept += 1;
                continue;
            }
            if self.repository.delete(&metadata.backup_id).await? {
                report.deleted.push(metadata.backup_id);
            }
        }

        tracing::info!(
            "[BackupManager] Pruned {} snapshot(s), kept {}",
            report.removed(),
            report.kept
        );
        Ok(report)
    }
}

/// Commit hook that snapshots the durable record before it is overwritten.
///
/// Nothing is captured for entities that have never been written.
pub struct CaptureBefore {
    manager: Arc<BackupManager>,
    reason: &'static str,
}

impl CaptureBefore {
    pub fn new(manager: Arc<BackupManager>, reason: &'static str) -> Self {
        Self { manager, reason }
    }
}

#[async_trait]
impl CommitHook for CaptureBefore {
    async fn before_commit(&self, current: Option<&ConfigEntity>) -> Result<()> {
        if let Some(current) = current {
            self.manager.snapshot(current, self.reason).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use tenantsync_core::backup::reason;
    use tenantsync_infrastructure::{FileBackupRepository, FileConfigRepository};

    struct Fixture {
        store: Arc<VersionedStore>,
        backups: Arc<BackupManager>,
        repository: Arc<FileBackupRepository>,
        _temp_dir: TempDir,
    }

    async fn create_fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(VersionedStore::new(Arc::new(
            FileConfigRepository::new(temp_dir.path()).await.unwrap(),
        )));
        let repository = Arc::new(FileBackupRepository::new(temp_dir.path()).await.unwrap());
        let backups = Arc::new(BackupManager::new(store.clone(), repository.clone()));
        Fixture {
            store,
            backups,
            repository,
            _temp_dir: temp_dir,
        }
    }

    fn record_at(entity_id: &str, captured_at: DateTime<Utc>) -> BackupRecord {
        BackupRecord {
            backup_id: generate_backup_id(entity_id, reason::MANUAL, captured_at),
            entity_id: entity_id.to_string(),
            reason: reason::MANUAL.to_string(),
            captured_at,
            size_bytes: 1,
            payload: ConfigEntity::with_defaults(entity_id),
        }
    }

    #[tokio::test]
    async fn test_capture_then_restore_brings_back_contents() {
        let fx = create_fixture().await;
        fx.store
            .write_section("E1", "moderation", json!({"enabled": true}), "alice")
            .await
            .unwrap();
        let captured = fx.store.read_entity("E1").await.unwrap();

        let backup = fx.backups.capture("E1", reason::MANUAL).await.unwrap();
        assert!(backup.size_bytes > 0);
        assert_eq!(backup.reason, "manual");

        fx.store
            .write_section("E1", "moderation", json!({"enabled": false}), "bob")
            .await
            .unwrap();

        let restored = fx.backups.restore(&backup.backup_id).await.unwrap();
        assert_eq!(restored, captured);
        let current = fx.store.read_entity("E1").await.unwrap();
        assert_eq!(current.section("moderation"), Some(&json!({"enabled": true})));
        assert_eq!(current, captured);
    }

    #[tokio::test]
    async fn test_restore_captures_pre_restore_snapshot() {
        let fx = create_fixture().await;
        fx.store
            .write_section("E1", "welcome", json!({"enabled": true}), "alice")
            .await
            .unwrap();
        let backup = fx.backups.capture("E1", reason::MANUAL).await.unwrap();
        fx.store
            .write_section("E1", "welcome", json!({"enabled": false}), "bob")
            .await
            .unwrap();

        fx.backups.restore(&backup.backup_id).await.unwrap();

        let list = fx.backups.list(Some("E1")).await.unwrap();
        let pre_restore: Vec<_> = list
            .iter()
            .filter(|m| m.reason == reason::PRE_RESTORE)
            .collect();
        assert_eq!(pre_restore.len(), 1);

        let undo = fx.backups.get(&pre_restore[0].backup_id).await.unwrap();
        assert_eq!(
            undo.payload.section("welcome"),
            Some(&json!({"enabled": false}))
        );
    }

    #[tokio::test]
    async fn test_capture_of_unwritten_entity_uses_defaults() {
        let fx = create_fixture().await;
        let backup = fx.backups.capture("fresh", reason::MANUAL).await.unwrap();

        let record = fx.backups.get(&backup.backup_id).await.unwrap();
        assert_eq!(record.payload, ConfigEntity::with_defaults("fresh"));
        assert!(!fx.store.exists("fresh").await.unwrap());
    }

    #[tokio::test]
    async fn test_same_millisecond_captures_get_distinct_ids() {
        let fx = create_fixture().await;
        let entity = ConfigEntity::with_defaults("E1");

        let mut ids = HashSet::new();
        for _ in 0..5 {
            let backup = fx.backups.snapshot(&entity, reason::MANUAL).await.unwrap();
            ids.insert(backup.backup_id);
        }
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_unknown_backup_is_not_found() {
        let fx = create_fixture().await;

        assert!(fx.backups.get("missing").await.unwrap_err().is_not_found());
        assert!(fx.backups.restore("missing").await.unwrap_err().is_not_found());
        assert!(fx.backups.delete("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_prune_keeps_newest_per_entity() {
        let fx = create_fixture().await;
        let now = Utc::now();
        let old_only = record_at("E1", now - Duration::days(90));
        let stale = record_at("E2", now - Duration::days(60));
        let recent = record_at("E2", now - Duration::days(1));
        for record in [&old_only, &stale, &recent] {
            fx.repository.insert(record).await.unwrap();
        }

        let report = fx.backups.prune(30).await.unwrap();

        assert_eq!(report.deleted, vec![stale.backup_id.clone()]);
        assert_eq!(report.kept, 2);
        let remaining: Vec<_> = fx
            .backups
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.backup_id)
            .collect();
        assert!(remaining.contains(&old_only.backup_id));
        assert!(remaining.contains(&recent.backup_id));
    }

    #[tokio::test]
    async fn test_deleting_all_snapshots_empties_backup_dir() {
        let fx = create_fixture().await;
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(fx.backups.capture("E1", reason::MANUAL).await.unwrap().backup_id);
        }
        for id in &ids {
            fx.backups.delete(id).await.unwrap();
        }

        let leftovers: Vec<_> = std::fs::read_dir(fx.repository.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name.to_string_lossy().starts_with("E1_"))
            .collect();
        assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
        assert!(fx.backups.list(Some("E1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune_with_huge_age_keeps_everything() {
        let fx = create_fixture().await;
        let now = Utc::now();
        let ancient = record_at("E1", now - Duration::days(3650));
        let recent = record_at("E1", now);
        for record in [&ancient, &recent] {
            fx.repository.insert(record).await.unwrap();
        }

        let report = fx.backups.prune(u32::MAX).await.unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(report.kept, 2);
        assert_eq!(fx.backups.list(Some("E1")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_capture_before_skips_unwritten_entities() {
        let fx = create_fixture().await;
        let hook = CaptureBefore::new(fx.backups.clone(), reason::PRE_CHANGE);

        fx.store
            .update_section(
                "E1",
                "admins",
                crate::store::SectionUpdate::Replace(json!({"users": ["u1"]})),
                "alice",
                Some(&hook),
            )
            .await
            .unwrap();
        assert!(fx.backups.list(Some("E1")).await.unwrap().is_empty());

        fx.store
            .update_section(
                "E1",
                "admins",
                crate::store::SectionUpdate::Replace(json!({"users": []})),
                "alice",
                Some(&hook),
            )
            .await
            .unwrap();
        let list = fx.backups.list(Some("E1")).await.unwrap();
        assert_eq!(list.len(), 1);
        let record = fx.backups.get(&list[0].backup_id).await.unwrap();
        assert_eq!(record.payload.section("admins"), Some(&json!({"users": ["u1"]})));
    }
}
