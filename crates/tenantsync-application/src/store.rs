//! Versioned Store: the authoritative per-entity configuration record.
//!
//! Every mutation of an entity runs inside that entity's critical section:
//! load, apply, persist, release. Two concurrent partial-section writes to the
//! same entity therefore never produce a merged record that lost one of them.
//! Reads take no lock; the repository persists whole records atomically, so a
//! reader sees the record before or after a write, never in between.
//!
//! # Consistency across sessions
//!
//! Writes are last-write-wins at section granularity. Two dashboard sessions
//! editing the same section of the same entity overwrite each other without
//! conflict detection. This is an accepted trade-off, not a guarantee of
//! safety.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tenantsync_core::entity::{
    ConfigEntity, ConfigRepository, merge_shallow, validate_entity_id, validate_section_name,
};
use tenantsync_core::error::{Result, TenantSyncError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Runs inside an entity's critical section right before a mutation is
/// persisted. Returning an error aborts the mutation.
///
/// Receives the durable record as it is at that moment, or `None` when the
/// entity has never been written.
#[async_trait]
pub trait CommitHook: Send + Sync {
    async fn before_commit(&self, current: Option<&ConfigEntity>) -> Result<()>;
}

/// How a section write combines with the stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionUpdate {
    /// Store the value as given.
    Replace(Value),
    /// Shallow-merge the value over the stored section.
    Merge(Value),
}

/// Per-entity mutual exclusion.
///
/// Entries are dropped once nobody holds or waits for them.
#[derive(Default)]
struct EntityLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    async fn acquire(&self, entity_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(entity_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct VersionedStore {
    repository: Arc<dyn ConfigRepository>,
    locks: EntityLocks,
}

impl VersionedStore {
    pub fn new(repository: Arc<dyn ConfigRepository>) -> Self {
        Self {
            repository,
            locks: EntityLocks::default(),
        }
    }

    /// Returns the entity, or the built-in defaults when it has never been
    /// written. Never creates a durable record.
    pub async fn read_entity(&self, entity_id: &str) -> Result<ConfigEntity> {
        validate_entity_id(entity_id)?;
        Ok(self
            .repository
            .find_by_id(entity_id)
            .await?
            .unwrap_or_else(|| ConfigEntity::with_defaults(entity_id)))
    }

    /// Whether a durable record exists for the entity.
    pub async fn exists(&self, entity_id: &str) -> Result<bool> {
        validate_entity_id(entity_id)?;
        Ok(self.repository.find_by_id(entity_id).await?.is_some())
    }

    /// Replaces exactly one section and returns the caller's value unchanged.
    pub async fn write_section(
        &self,
        entity_id: &str,
        section: &str,
        value: Value,
        actor: &str,
    ) -> Result<Value> {
        self.update_section(entity_id, section, SectionUpdate::Replace(value), actor, None)
            .await
    }

    /// Shallow-merges `patch` over one section and returns the merged value.
    pub async fn merge_section(
        &self,
        entity_id: &str,
        section: &str,
        patch: Value,
        actor: &str,
    ) -> Result<Value> {
        self.update_section(entity_id, section, SectionUpdate::Merge(patch), actor, None)
            .await
    }

    /// Updates one section inside the entity's critical section.
    ///
    /// Siblings are untouched; `updated_at` and `updated_by` are stamped; the
    /// whole entity is persisted in one atomic write. On failure nothing is
    /// durable.
    pub async fn update_section(
        &self,
        entity_id: &str,
        section: &str,
        update: SectionUpdate,
        actor: &str,
        hook: Option<&dyn CommitHook>,
    ) -> Result<Value> {
        validate_entity_id(entity_id)?;
        validate_section_name(section)?;
        validate_actor(actor)?;

        let _guard = self.locks.acquire(entity_id).await;

        let durable = self.repository.find_by_id(entity_id).await?;
        if let Some(hook) = hook {
            hook.before_commit(durable.as_ref()).await?;
        }
        let mut entity = durable.unwrap_or_else(|| ConfigEntity::with_defaults(entity_id));

        let stored = match update {
            SectionUpdate::Replace(value) => value,
            SectionUpdate::Merge(patch) => match entity.section(section) {
                Some(current) => merge_shallow(current, &patch),
                None => patch,
            },
        };

        entity.apply_section(section, stored.clone(), actor, Utc::now());
        self.repository.save(&entity).await?;

        tracing::info!(
            entity_id,
            section,
            actor,
            "[VersionedStore] Section committed"
        );
        Ok(stored)
    }

    /// Overwrites the entity in full, exactly as given (no re-stamping).
    pub async fn replace_entity(
        &self,
        entity: ConfigEntity,
        hook: Option<&dyn CommitHook>,
    ) -> Result<ConfigEntity> {
        validate_entity_id(&entity.entity_id)?;

        let _guard = self.locks.acquire(&entity.entity_id).await;

        if let Some(hook) = hook {
            let durable = self.repository.find_by_id(&entity.entity_id).await?;
            hook.before_commit(durable.as_ref()).await?;
        }
        self.repository.save(&entity).await?;

        tracing::info!(
            entity_id = %entity.entity_id,
            "[VersionedStore] Entity replaced"
        );
        Ok(entity)
    }

    /// Removes the entity. Idempotent: returns whether a record existed.
    pub async fn delete_entity(
        &self,
        entity_id: &str,
        hook: Option<&dyn CommitHook>,
    ) -> Result<bool> {
        validate_entity_id(entity_id)?;

        let _guard = self.locks.acquire(entity_id).await;

        if let Some(hook) = hook {
            let durable = self.repository.find_by_id(entity_id).await?;
            hook.before_commit(durable.as_ref()).await?;
        }
        let existed = self.repository.delete(entity_id).await?;

        tracing::info!(entity_id, existed, "[VersionedStore] Entity deleted");
        Ok(existed)
    }
}

fn validate_actor(actor: &str) -> Result<()> {
    if actor.trim().is_empty() {
        return Err(TenantSyncError::missing("actor"));
    }
    Ok(())
}
