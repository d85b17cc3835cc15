//! Use cases behind the configuration API.
//!
//! Ties the store, the backup manager and propagation together: snapshots
//! happen inside the write's critical section, notifications happen after the
//! write is durable and never affect its outcome.

use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tenantsync_core::backup::reason;
use tenantsync_core::entity::ConfigEntity;
use tenantsync_core::error::{Result, TenantSyncError};
use tenantsync_core::propagation::PropagationEvent;

use crate::backup_manager::{BackupManager, CaptureBefore};
use crate::propagation::PropagationDispatcher;
use crate::store::{SectionUpdate, VersionedStore};

pub struct ConfigUseCase {
    store: Arc<VersionedStore>,
    backups: Arc<BackupManager>,
    dispatcher: PropagationDispatcher,
    capture_before_sections: HashSet<String>,
}

impl ConfigUseCase {
    pub fn new(
        store: Arc<VersionedStore>,
        backups: Arc<BackupManager>,
        dispatcher: PropagationDispatcher,
        capture_before_sections: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            store,
            backups,
            dispatcher,
            capture_before_sections: capture_before_sections.into_iter().collect(),
        }
    }

    pub fn store(&self) -> &Arc<VersionedStore> {
        &self.store
    }

    pub fn backups(&self) -> &Arc<BackupManager> {
        &self.backups
    }

    pub async fn read_entity(&self, entity_id: &str) -> Result<ConfigEntity> {
        self.store.read_entity(entity_id).await
    }

    /// Shallow-merges `data` into one section, then notifies the agent.
    ///
    /// Returns the merged value now stored.
    pub async fn update_section(
        &self,
        entity_id: &str,
        section: &str,
        data: Value,
        actor: &str,
    ) -> Result<Value> {
        self.commit(entity_id, section, SectionUpdate::Merge(data), actor)
            .await
    }

    /// Replaces one section, then notifies the agent.
    pub async fn write_section(
        &self,
        entity_id: &str,
        section: &str,
        data: Value,
        actor: &str,
    ) -> Result<Value> {
        self.commit(entity_id, section, SectionUpdate::Replace(data), actor)
            .await
    }

    async fn commit(
        &self,
        entity_id: &str,
        section: &str,
        update: SectionUpdate,
        actor: &str,
    ) -> Result<Value> {
        let stored = if self.capture_before_sections.contains(section) {
            let hook = CaptureBefore::new(self.backups.clone(), reason::PRE_CHANGE);
            self.store
                .update_section(entity_id, section, update, actor, Some(&hook))
                .await?
        } else {
            self.store
                .update_section(entity_id, section, update, actor, None)
                .await?
        };

        self.dispatcher
            .dispatch(PropagationEvent::new(entity_id, section, stored.clone()));
        Ok(stored)
    }

    /// Deletes the entity after a `pre-delete` snapshot.
    ///
    /// Idempotent unless `must_exist` is set, in which case deleting an
    /// entity without a durable record is `NotFound`.
    pub async fn delete_entity(
        &self,
        entity_id: &str,
        actor: &str,
        must_exist: bool,
    ) -> Result<()> {
        if actor.trim().is_empty() {
            return Err(TenantSyncError::missing("actor"));
        }
        let hook = CaptureBefore::new(self.backups.clone(), reason::PRE_DELETE);
        let existed = self.store.delete_entity(entity_id, Some(&hook)).await?;

        if !existed && must_exist {
            return Err(TenantSyncError::not_found("entity", entity_id));
        }
        tracing::info!(
            "[ConfigUseCase] Entity {} deleted by {} (existed: {})",
            entity_id,
            actor,
            existed
        );
        Ok(())
    }

    /// Restores a snapshot and notifies the agent of every restored section.
    pub async fn restore_backup(&self, backup_id: &str) -> Result<ConfigEntity> {
        let restored = self.backups.restore(backup_id).await?;
        for (section, data) in &restored.sections {
            self.dispatcher.dispatch(PropagationEvent::new(
                restored.entity_id.clone(),
                section.clone(),
                data.clone(),
            ));
        }
        Ok(restored)
    }
}
